//! Backend commands queued from UI to backend worker.

use shared::domain::{GuestId, NewRsvp};

pub enum BackendCommand {
    SubmitRsvp { rsvp: NewRsvp },
    FetchGuestList,
    DeleteGuest { id: GuestId },
    AdminLogin { password: String },
}
