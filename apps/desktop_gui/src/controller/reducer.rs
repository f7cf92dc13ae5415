//! Explicit application state with named transitions.
//!
//! Every mutation of the RSVP flow goes through one of the methods below, so
//! the whole screen flow is unit-testable without a rendering environment.
//! The guest list is only ever replaced wholesale with the latest
//! server-confirmed listing; the single optimistic change is the `confirmed`
//! flip after an accepted submission.

use shared::domain::{is_valid_party_size, Guest};

/// The four mutually exclusive screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    RsvpForm,
    Confirmation,
    AdminLogin,
    AdminPanel,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub name: String,
    pub email: String,
    pub party_size: i64,
    pub confirmed: bool,
    /// Name shown on the confirmation screen; kept apart from the form
    /// field, which is cleared on acceptance.
    pub confirmed_name: String,
    pub show_admin_login: bool,
    pub admin_password_input: String,
    pub is_admin: bool,
    pub guest_list: Vec<Guest>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            party_size: 1,
            confirmed: false,
            confirmed_name: String::new(),
            show_admin_login: false,
            admin_password_input: String::new(),
            is_admin: false,
            guest_list: Vec::new(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Screen selection is a pure function of state. Admin wins over the
    /// login prompt, which wins over the confirmation screen.
    pub fn screen(&self) -> Screen {
        if self.is_admin {
            Screen::AdminPanel
        } else if self.show_admin_login {
            Screen::AdminLogin
        } else if self.confirmed {
            Screen::Confirmation
        } else {
            Screen::RsvpForm
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.email.trim().is_empty()
            && is_valid_party_size(self.party_size)
    }

    /// The store accepted the submission: flip to the confirmation screen
    /// and reset the form.
    pub fn rsvp_accepted(&mut self, name: String) {
        self.confirmed = true;
        self.confirmed_name = name;
        self.name.clear();
        self.email.clear();
        self.party_size = 1;
    }

    /// A failed submission keeps the form exactly as entered.
    pub fn rsvp_rejected(&mut self) {}

    pub fn request_admin_login(&mut self) {
        self.show_admin_login = true;
    }

    pub fn cancel_admin_login(&mut self) {
        self.show_admin_login = false;
    }

    pub fn admin_authenticated(&mut self) {
        self.is_admin = true;
        self.admin_password_input.clear();
    }

    /// A rejected password keeps the login screen up.
    pub fn admin_login_rejected(&mut self) {}

    /// Leaving the panel only drops the admin flag; where the user lands is
    /// decided by the screen precedence.
    pub fn exit_admin_panel(&mut self) {
        self.is_admin = false;
    }

    /// Wholesale replacement with the latest server-confirmed listing; no
    /// incremental merge, no diffing.
    pub fn guest_list_replaced(&mut self, guests: Vec<Guest>) {
        self.guest_list = guests;
    }

    pub fn total_guest_count(&self) -> i64 {
        self.guest_list.iter().map(|guest| guest.guests).sum()
    }

    pub fn average_party_size(&self) -> f64 {
        if self.guest_list.is_empty() {
            0.0
        } else {
            self.total_guest_count() as f64 / self.guest_list.len() as f64
        }
    }
}

#[cfg(test)]
#[path = "../tests/reducer_tests.rs"]
mod tests;
