//! Backend worker: owns the tokio runtime, the store client, and the single
//! change-feed subscription.

use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender};
use store_client::{GuestStore, HostedGuestStore, StoreSettings};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(settings: StoreSettings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || run_worker(settings, cmd_rx, ui_tx));
}

fn run_worker(settings: StoreSettings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::Startup,
                format!("backend worker startup failure: failed to build runtime: {err}"),
            )));
            error!("failed to build backend runtime: {err}");
            return;
        }
    };

    runtime.block_on(async move {
        let store = Arc::new(HostedGuestStore::new(settings));

        // One subscription for the worker's lifetime. The handle is dropped
        // when this scope ends, so the feed is released on every exit path.
        let _feed = match store.start_change_feed().await {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("change feed unavailable: {err}");
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::Startup,
                    format!("live updates unavailable: {err}"),
                )));
                None
            }
        };

        // Every change notice triggers a wholesale re-read of the listing;
        // the notice payload itself is never interpreted.
        let refresh_store = Arc::clone(&store);
        let refresh_tx = ui_tx.clone();
        let mut changes = store.subscribe_changes();
        let refresh_task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(notice) => {
                        info!(kind = ?notice.kind, "guest table changed; refreshing list");
                        send_fresh_guest_list(refresh_store.as_ref(), &refresh_tx).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change notices lagged; refreshing once");
                        send_fresh_guest_list(refresh_store.as_ref(), &refresh_tx).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let _ = ui_tx.try_send(UiEvent::Info("Connected to the guest store".to_string()));

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                BackendCommand::SubmitRsvp { rsvp } => match store.submit_rsvp(&rsvp).await {
                    Ok(()) => {
                        let _ = ui_tx.try_send(UiEvent::RsvpAccepted {
                            name: rsvp.name.clone(),
                        });
                    }
                    Err(err) => {
                        warn!("rsvp submission failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::RsvpFailed(UiError::from_message(
                            UiErrorContext::SubmitRsvp,
                            err.to_string(),
                        )));
                    }
                },
                BackendCommand::FetchGuestList => {
                    send_fresh_guest_list(store.as_ref(), &ui_tx).await;
                }
                BackendCommand::DeleteGuest { id } => {
                    // The list refresh arrives via the change feed, never as
                    // an optimistic local removal.
                    if let Err(err) = store.delete_guest(&id).await {
                        warn!(%id, "guest deletion failed: {err}");
                        let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                            UiErrorContext::DeleteGuest,
                            err.to_string(),
                        )));
                    }
                }
                BackendCommand::AdminLogin { password } => {
                    match store.authenticate_admin(&password).await {
                        Ok(_session) => {
                            let _ = ui_tx.try_send(UiEvent::AdminLoginOk);
                        }
                        Err(err) => {
                            warn!("admin sign-in failed: {err}");
                            let _ = ui_tx.try_send(UiEvent::AdminLoginFailed(
                                UiError::from_message(
                                    UiErrorContext::AdminLogin,
                                    err.to_string(),
                                ),
                            ));
                        }
                    }
                }
            }
        }

        refresh_task.abort();
        info!("backend worker stopped");
    });
}

async fn send_fresh_guest_list(store: &HostedGuestStore, ui_tx: &Sender<UiEvent>) {
    match store.list_guests().await {
        Ok(guests) => {
            let _ = ui_tx.try_send(UiEvent::GuestListLoaded(guests));
        }
        Err(err) => {
            warn!("guest list refresh failed: {err}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::GuestList,
                err.to_string(),
            )));
        }
    }
}
