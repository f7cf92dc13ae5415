use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{GuestId, NewRsvp, PARTY_SIZE_CHOICES};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_sign_in_failure, UiError, UiErrorCategory, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::reducer::{AppState, Screen};

const EVENT_DATE: &str = "June 15, 2024";
const EVENT_VENUE: &str = "Elegance Party Hall";
const EVENT_TIME: &str = "19:00";

struct StatusBanner {
    text: String,
    is_error: bool,
}

pub struct RsvpDeskApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    state: AppState,
    status: String,
    banner: Option<StatusBanner>,
}

impl RsvpDeskApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            state: AppState::new(),
            status: String::new(),
            banner: None,
        }
    }

    /// Drain backend events and apply them as named state transitions.
    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(text) => {
                    self.status = text;
                }
                UiEvent::RsvpAccepted { name } => {
                    self.state.rsvp_accepted(name);
                    self.banner = None;
                }
                UiEvent::RsvpFailed(err) => {
                    self.state.rsvp_rejected();
                    self.banner = Some(error_banner(&err));
                }
                UiEvent::AdminLoginOk => {
                    self.state.admin_authenticated();
                    self.banner = None;
                    // One explicit fetch on entry so the panel is populated
                    // even before the first change notice arrives.
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::FetchGuestList,
                        &mut self.status,
                    );
                }
                UiEvent::AdminLoginFailed(err) => {
                    self.state.admin_login_rejected();
                    self.banner = Some(StatusBanner {
                        text: classify_sign_in_failure(err.message()),
                        is_error: true,
                    });
                }
                UiEvent::GuestListLoaded(guests) => {
                    self.state.guest_list_replaced(guests);
                }
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), "backend error: {}", err.message());
                    self.banner = Some(error_banner(&err));
                }
            }
        }
    }

    fn show_rsvp_form(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.heading("Confirm your attendance");
                ui.add_space(12.0);
                ui.label(format!("{EVENT_DATE} · {EVENT_VENUE} · {EVENT_TIME}"));
                ui.add_space(16.0);

                banner_ui(ui, self.banner.as_ref());

                ui.add(
                    egui::TextEdit::singleline(&mut self.state.name)
                        .hint_text("Full name")
                        .desired_width(280.0),
                );
                ui.add_space(8.0);
                ui.add(
                    egui::TextEdit::singleline(&mut self.state.email)
                        .hint_text("E-mail")
                        .desired_width(280.0),
                );
                ui.add_space(8.0);
                egui::ComboBox::from_id_salt("party_size")
                    .selected_text(party_size_label(self.state.party_size))
                    .show_ui(ui, |ui| {
                        for choice in PARTY_SIZE_CHOICES {
                            ui.selectable_value(
                                &mut self.state.party_size,
                                choice,
                                party_size_label(choice),
                            );
                        }
                    });
                ui.add_space(16.0);

                let submit = ui
                    .add_enabled(
                        self.state.can_submit(),
                        egui::Button::new("Confirm attendance"),
                    )
                    .clicked();
                if submit {
                    let rsvp = NewRsvp {
                        name: self.state.name.clone(),
                        email: self.state.email.clone(),
                        guests: self.state.party_size,
                    };
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::SubmitRsvp { rsvp },
                        &mut self.status,
                    );
                }

                ui.add_space(16.0);
                if ui.link("Admin access").clicked() {
                    self.state.request_admin_login();
                }
            });
        });
    }

    fn show_confirmation(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(64.0);
                ui.heading("Attendance confirmed!");
                ui.add_space(16.0);
                ui.label(format!(
                    "Thank you, {}! Your confirmation has been received.",
                    self.state.confirmed_name
                ));
                ui.add_space(24.0);
                if ui.link("Admin access").clicked() {
                    self.state.request_admin_login();
                }
            });
        });
    }

    fn show_admin_login(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(64.0);
                ui.heading("Admin access");
                ui.add_space(16.0);

                banner_ui(ui, self.banner.as_ref());

                ui.add(
                    egui::TextEdit::singleline(&mut self.state.admin_password_input)
                        .password(true)
                        .hint_text("Enter the password")
                        .desired_width(280.0),
                );
                ui.add_space(12.0);
                ui.horizontal(|ui| {
                    // Center the two buttons under the field.
                    let spacing = (ui.available_width() - 180.0).max(0.0) / 2.0;
                    ui.add_space(spacing);
                    if ui.button("Back").clicked() {
                        self.state.cancel_admin_login();
                        self.banner = None;
                    }
                    let can_sign_in = !self.state.admin_password_input.is_empty();
                    if ui
                        .add_enabled(can_sign_in, egui::Button::new("Sign in"))
                        .clicked()
                    {
                        dispatch_backend_command(
                            &self.cmd_tx,
                            BackendCommand::AdminLogin {
                                password: self.state.admin_password_input.clone(),
                            },
                            &mut self.status,
                        );
                    }
                });
            });
        });
    }

    fn show_admin_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Admin panel");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Back").clicked() {
                        self.state.exit_admin_panel();
                    }
                });
            });
            ui.add_space(8.0);

            banner_ui(ui, self.banner.as_ref());

            ui.horizontal(|ui| {
                stat_tile(ui, "Confirmations", self.state.guest_list.len().to_string());
                stat_tile(ui, "Total guests", self.state.total_guest_count().to_string());
                stat_tile(
                    ui,
                    "Average party size",
                    format!("{:.1}", self.state.average_party_size()),
                );
            });
            ui.add_space(12.0);

            let mut pending_delete: Option<GuestId> = None;
            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Grid::new("guest_table")
                    .striped(true)
                    .num_columns(5)
                    .show(ui, |ui| {
                        for header in ["Name", "Email", "Guests", "Confirmed", ""] {
                            ui.label(egui::RichText::new(header).strong());
                        }
                        ui.end_row();

                        for guest in &self.state.guest_list {
                            ui.label(&guest.name);
                            ui.label(&guest.email);
                            ui.label(guest.guests.to_string());
                            ui.label(
                                guest
                                    .confirmation_date
                                    .with_timezone(&chrono::Local)
                                    .format("%d/%m/%Y %H:%M")
                                    .to_string(),
                            );
                            if ui.button("Remove").clicked() {
                                pending_delete = Some(guest.id.clone());
                            }
                            ui.end_row();
                        }
                    });
            });
            if let Some(id) = pending_delete {
                // The refresh arrives through the change feed.
                dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::DeleteGuest { id },
                    &mut self.status,
                );
            }

            if !self.status.is_empty() {
                ui.add_space(8.0);
                ui.weak(self.status.as_str());
            }
        });
    }
}

impl eframe::App for RsvpDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        match self.state.screen() {
            Screen::AdminPanel => self.show_admin_panel(ctx),
            Screen::AdminLogin => self.show_admin_login(ctx),
            Screen::Confirmation => self.show_confirmation(ctx),
            Screen::RsvpForm => self.show_rsvp_form(ctx),
        }

        // Backend events arrive between frames; keep polling at a calm rate.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

/// Validation problems are user-correctable; style them softer than
/// transport or auth failures.
fn error_banner(err: &UiError) -> StatusBanner {
    StatusBanner {
        text: err.message().to_string(),
        is_error: err.category() != UiErrorCategory::Validation,
    }
}

fn banner_ui(ui: &mut egui::Ui, banner: Option<&StatusBanner>) {
    if let Some(banner) = banner {
        let color = if banner.is_error {
            ui.visuals().error_fg_color
        } else {
            ui.visuals().weak_text_color()
        };
        ui.colored_label(color, banner.text.as_str());
        ui.add_space(8.0);
    }
}

fn stat_tile(ui: &mut egui::Ui, label: &str, value: String) {
    ui.group(|ui| {
        ui.vertical(|ui| {
            ui.label(label);
            ui.heading(value);
        });
    });
}

fn party_size_label(party_size: i64) -> String {
    if party_size == 1 {
        "1 person".to_string()
    } else {
        format!("{party_size} people")
    }
}
