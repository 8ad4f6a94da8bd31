pub mod appointments;
pub mod consultations;
pub mod domain;
pub mod identity;
pub mod messaging;
pub mod ports;

#[cfg(test)]
pub(crate) mod memory;

pub use domain::{
    Appointment, AppointmentStatus, AppointmentView, BookingRequest, Caller, Consultation,
    ConsultationUpdate, Doctor, Identity, Inbox, Message, MessageFilters, NewConsultation,
    OutgoingMessage, Page, PageRequest, PartyRef, Patient, Role,
};
pub use ports::{
    AppointmentStore, ConsultationStore, Email, FieldError, IdentityStore, Mailer, MessageStore,
    PortError, PortResult,
};
