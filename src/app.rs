use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use crossterm::event::{self, Event};
use ratatui::layout::Rect;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::api::DirectoryApi;
use crate::config::Config;
use crate::core::User;
use crate::render::RenderState;
use crate::store::{Completion, RemoteCall, Request, Response, Scope};
use crate::tea::{start, update, Command, Message, Model};
use crate::{tlog_debug, tlog_warn, Result};

const MAX_BG_MESSAGES: usize = 50;

pub struct LogicThread;

impl LogicThread {
    pub fn run(
        config: Config,
        api: Arc<dyn DirectoryApi>,
        principal: User,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        Runtime::new()?.block_on(Self::run_async(config, api, principal, state_tx, shutdown))
    }

    async fn run_async(
        config: Config,
        api: Arc<dyn DirectoryApi>,
        principal: User,
        state_tx: Sender<RenderState>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        tlog_debug!(
            "LogicThread::run_async api_url={} principal={}",
            config.api_url,
            principal.email
        );
        let (width, height) = crossterm::terminal::size()?;
        let mut model = Model::new(principal, config, Rect::new(0, 0, width, height));
        let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();

        for cmd in start(&mut model) {
            execute_command(cmd, &api, &msg_tx);
        }
        send_state(&state_tx, &model);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Terminal input (priority)
            while event::poll(Duration::ZERO)? {
                let msg = match event::read()? {
                    Event::Key(key) => Message::Key(key),
                    Event::Mouse(mouse) => Message::Mouse(mouse),
                    Event::Resize(w, h) => Message::Resize(w, h),
                    _ => continue,
                };

                for cmd in update(&mut model, msg) {
                    if execute_command(cmd, &api, &msg_tx) {
                        shutdown.store(true, Ordering::Relaxed);
                        return Ok(());
                    }
                }

                if model.dirty {
                    send_state(&state_tx, &model);
                    model.dirty = false;
                }
            }

            // Remote completions (bounded)
            for _ in 0..MAX_BG_MESSAGES {
                let Ok(msg) = msg_rx.try_recv() else { break };
                for cmd in update(&mut model, msg) {
                    if execute_command(cmd, &api, &msg_tx) {
                        shutdown.store(true, Ordering::Relaxed);
                        return Ok(());
                    }
                }
            }

            if model.dirty {
                send_state(&state_tx, &model);
                model.dirty = false;
            }

            tokio::time::sleep(Duration::from_micros(500)).await;
        }

        Ok(())
    }
}

/// Returns true when the app should quit.
fn execute_command(
    cmd: Command,
    api: &Arc<dyn DirectoryApi>,
    msg_tx: &mpsc::UnboundedSender<Message>,
) -> bool {
    match cmd {
        Command::Remote(call) => {
            tlog_debug!("Command::Remote {} {:?}", call.op, call.request);
            let api = api.clone();
            let tx = msg_tx.clone();
            tokio::spawn(async move {
                let cancel = call.cancel.clone();
                let completion = match cancel {
                    Some(token) => {
                        tokio::select! {
                            _ = token.cancelled() => None,
                            completion = perform(api.as_ref(), call) => Some(completion),
                        }
                    }
                    None => Some(perform(api.as_ref(), call).await),
                };
                match completion {
                    Some(completion) => {
                        let _ = tx.send(Message::Remote(completion));
                    }
                    None => tlog_debug!("remote call cancelled"),
                }
            });
        }

        Command::Quit => {
            tlog_debug!("Command::Quit");
            return true;
        }
    }

    false
}

/// Execute one store request against the directory.
pub async fn perform(api: &dyn DirectoryApi, call: RemoteCall) -> Completion {
    let RemoteCall { op, request, .. } = call;
    let result = match &request {
        Request::Load(ticket) => match ticket.scope {
            Scope::Organizations => {
                api.organizations().await.map(Response::Organizations)
            }
            Scope::Projects(org) => api.projects(org).await.map(Response::Projects),
            Scope::Tasks(org, project) => {
                api.tasks(org, project).await.map(Response::Tasks)
            }
            Scope::Members(org) => api.members(org).await.map(Response::Members),
        },
        Request::CreateOrganization(input) => api
            .create_organization(input)
            .await
            .map(|_| Response::Created),
        Request::JoinOrganization(input) => {
            api.join_organization(input).await.map(|_| Response::Created)
        }
        Request::CreateProject { org, input } => api
            .create_project(*org, input)
            .await
            .map(|_| Response::Created),
        Request::CreateTask {
            org,
            project,
            input,
        } => api
            .create_task(*org, *project, input)
            .await
            .map(|_| Response::Created),
        Request::UpdateProjectStatus {
            org,
            project,
            status,
        } => api
            .update_project_status(*org, *project, *status)
            .await
            .map(|_| Response::Accepted),
        Request::MoveTask {
            org,
            project,
            task,
            status,
        } => api
            .move_task(*org, *project, *task, *status)
            .await
            .map(|_| Response::Accepted),
        Request::BulkMoveTasks {
            org,
            project,
            input,
        } => api
            .bulk_move_tasks(*org, *project, input)
            .await
            .map(|_| Response::Accepted),
    };

    if let Err(e) = &result {
        tlog_warn!("remote call failed {}: {}", op, e);
    }

    Completion {
        op,
        request,
        result,
    }
}

fn send_state(state_tx: &Sender<RenderState>, model: &Model) {
    let _ = state_tx.try_send(model.snapshot());
}
