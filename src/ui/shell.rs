use std::io::Write;

use anyhow::Result;
use chrono::Local;

use crate::usecases::contracts::{AppEventSource, ShellOrchestrator};

use super::render::render_output;

/// Runs the chat shell until the orchestrator stops, writing rendered output
/// to `out` after every event.
pub fn start(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
    out: &mut dyn Write,
) -> Result<()> {
    tracing::info!("starting chat shell");

    flush_output(orchestrator, out)?;
    while orchestrator.is_running() {
        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
        flush_output(orchestrator, out)?;
    }

    tracing::info!("chat shell stopped");
    Ok(())
}

fn flush_output(orchestrator: &mut dyn ShellOrchestrator, out: &mut dyn Write) -> Result<()> {
    let output = orchestrator.take_output();
    if output.is_empty() {
        return Ok(());
    }

    let now = Local::now();
    for item in &output {
        for line in render_output(item, &now) {
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Arc};

    use super::*;
    use crate::{
        domain::events::AppEvent,
        test_support::{memory_local_store, StubRemote},
        ui::event_source::MockEventSource,
        usecases::{
            chat_session::ChatSession, chat_shell::ChatShell, dual_store::DualStore,
            initialize::initialize,
        },
    };

    #[test]
    fn runs_until_quit_and_prints_sent_messages() {
        let initialized =
            initialize(DualStore::<StubRemote, _>::local_only(memory_local_store()), 1);
        let (tx, _rx) = mpsc::channel();
        let session = ChatSession::new(
            Arc::new(initialized.store),
            None,
            tx,
            initialized.identity,
            initialized.rooms,
        );
        let mut shell = ChatShell::new(session);
        shell.open("general");
        let mut source = MockEventSource::from(vec![
            AppEvent::Tick,
            AppEvent::Input("hello there".to_owned()),
            AppEvent::Input("/quit".to_owned()),
        ]);
        let mut out = Vec::new();

        start(&mut source, &mut shell, &mut out).expect("shell must run");

        let printed = String::from_utf8(out).expect("utf8 output");
        assert!(printed.contains("-- joined #General (local mode)"));
        assert!(printed.contains(": hello there"));
        assert!(!shell.is_running());
    }

    #[test]
    fn exhausted_input_stops_the_shell() {
        let initialized =
            initialize(DualStore::<StubRemote, _>::local_only(memory_local_store()), 1);
        let (tx, _rx) = mpsc::channel();
        let session = ChatSession::new(
            Arc::new(initialized.store),
            None,
            tx,
            initialized.identity,
            initialized.rooms,
        );
        let mut shell = ChatShell::new(session);
        shell.open("general");
        let mut source = MockEventSource::from(vec![AppEvent::Input("no quit".to_owned())]);
        let mut out = Vec::new();

        start(&mut source, &mut shell, &mut out).expect("shell must run");

        assert!(!shell.is_running());
        assert!(String::from_utf8(out).expect("utf8").contains(": no quit"));
    }
}
