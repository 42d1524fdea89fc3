use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use chrono::Local;

use crate::{
    cli::{CalcHistoryAction, Cli, Command, SettingsAction},
    domain::{
        self,
        identity::{now_ms, Identity},
        room::ChatRoom,
        settings::SettingKey,
    },
    infra, remote, ui,
    ui::render,
    usecases::{
        self, bootstrap, calc_history,
        clear_messages::clear_messages,
        context::AppContext,
        contracts::IdentityStore,
        create_room::create_room,
        delete_message::delete_message,
        dual_store::StoreMode,
        load_messages::load_messages,
        send_message::{send_message, SendMessageCommand},
        settings::SettingsSync,
    },
};

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;
    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        remote = remote::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        mode = context.store.mode().as_label(),
        "module boundaries loaded"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command_or_default() {
        Command::Chat { room } => {
            let mut shell = bootstrap::compose_shell(&context, room.as_deref().unwrap_or(""))?;
            ui::shell::start(
                shell.event_source.as_mut(),
                shell.orchestrator.as_mut(),
                &mut out,
            )
        }
        command => execute(&context, command, &mut out),
    }
}

/// Runs one non-interactive command against the context and prints the result.
fn execute(context: &AppContext, command: Command, out: &mut dyn Write) -> Result<()> {
    let now = Local::now();
    let store = &*context.store;

    let lines = match command {
        Command::Chat { .. } => return Err(anyhow!("chat needs an interactive terminal")),
        Command::Rooms => render::room_lines(&store.list_rooms()?.value, None, &now),
        Command::History { room } => {
            let room = lookup_room(&context.rooms, &room)?;
            let messages = load_messages(store, &room.id)?.value;
            if messages.is_empty() {
                vec![format!("-- no messages in #{}", room.name)]
            } else {
                messages
                    .iter()
                    .map(|message| render::message_line_with_id(message, &now))
                    .collect()
            }
        }
        Command::Send { room, text } => {
            let room = lookup_room(&context.rooms, &room)?;
            let command = SendMessageCommand {
                room_id: room.id.clone(),
                text: text.join(" "),
            };
            let sent = send_message(store, &context.identity, command, now_ms())?;
            vec![
                render::message_line_with_id(&sent.value, &now),
                served_by_line(sent.served_by),
            ]
        }
        Command::CreateRoom { name } => {
            let created = create_room(store, &name, now_ms())?;
            vec![
                format!("-- created #{} ({})", created.value.name, created.value.id),
                served_by_line(created.served_by),
            ]
        }
        Command::DeleteMessage { room, message_id } => {
            let room = lookup_room(&context.rooms, &room)?;
            let deleted = delete_message(store, &room.id, &message_id)?;
            vec![
                format!("-- message {message_id} deleted"),
                served_by_line(deleted.served_by),
            ]
        }
        Command::Clear { room } => {
            let room = lookup_room(&context.rooms, &room)?;
            let cleared = clear_messages(store, &room.id)?;
            vec![
                format!("-- cleared #{}", room.name),
                served_by_line(cleared.served_by),
            ]
        }
        Command::Whoami => identity_lines(context),
        Command::Rename { name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(anyhow!("name is empty"));
            }
            let identity = Identity::new(context.identity.user_id.clone(), Some(name.to_owned()));
            store
                .local()
                .save_identity(&identity)
                .context("failed to save identity")?;
            vec![format!("-- you are now {}", identity.user_name)]
        }
        Command::Settings { action } => settings_lines(context, action)?,
        Command::CalcHistory { action } => {
            let user_id = &context.identity.user_id;
            match action {
                CalcHistoryAction::List => {
                    render::calc_lines(&calc_history::list(store, user_id)?.value, &now)
                }
                CalcHistoryAction::Add { calculation } => {
                    let recorded =
                        calc_history::record(store, user_id, &calculation.join(" "), now_ms())?;
                    vec![
                        format!("-- recorded {}", recorded.value.calculation),
                        served_by_line(recorded.served_by),
                    ]
                }
                CalcHistoryAction::Clear => {
                    let cleared = calc_history::clear(store, user_id)?;
                    vec![
                        "-- calculator history cleared".to_owned(),
                        served_by_line(cleared.served_by),
                    ]
                }
            }
        }
    };

    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Dropping the sync at the end of the command drains any pending remote write.
fn settings_lines(context: &AppContext, action: SettingsAction) -> Result<Vec<String>> {
    let store = &*context.store;
    let mut sync = SettingsSync::start(
        store,
        &context.identity.user_id,
        context.config.sync.queue_capacity,
    )?;
    sync.load(store);

    let settings = match action {
        SettingsAction::Show => sync.current(),
        SettingsAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            sync.update(store, key, &value)?
        }
        SettingsAction::Reset => sync.reset(store)?,
    };

    Ok(render::settings_lines(settings))
}

fn lookup_room<'a>(rooms: &'a [ChatRoom], query: &str) -> Result<&'a ChatRoom> {
    rooms
        .iter()
        .find(|room| room.id == query)
        .or_else(|| {
            rooms
                .iter()
                .find(|room| room.name.eq_ignore_ascii_case(query))
        })
        .ok_or_else(|| anyhow!("unknown room: {query}"))
}

fn identity_lines(context: &AppContext) -> Vec<String> {
    vec![
        format!("user id: {}", context.identity.user_id),
        format!("name:    {}", context.identity.user_name),
        format!("storage: {}", context.store.mode().as_label()),
        format!("data:    {}", context.layout.data_dir.display()),
    ]
}

fn served_by_line(mode: StoreMode) -> String {
    format!("-- stored in {} store", mode.as_label())
}
