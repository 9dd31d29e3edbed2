//! Inbound dispatch table
//!
//! Every applicant event is routed exactly once from `(inbound, record)`.

use super::types::{ApplicantId, ApplicantRecord, Status};

/// Applicant event after the transport decoded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Start,
    Register,
    Cancel,
    Back,
    Status,
    About,
    Dashboard,
    Support,
    PayNow,
    Text(String),
    Contact { phone: String, owner: Option<ApplicantId> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Open,
    StartWizard,
    CancelWizard,
    StepBack,
    StepInput,
    ShowStatus,
    ShowAbout,
    ShowDashboard,
    ShowSupport,
    InitiatePayment,
    AwaitReview,
    Unregistered,
    Ignore,
}

pub fn route(inbound: &Inbound, record: Option<&ApplicantRecord>) -> Route {
    let status = record.map(|r| r.status);
    match inbound {
        Inbound::Start => Route::Open,
        Inbound::About => Route::ShowAbout,
        Inbound::Support => Route::ShowSupport,
        Inbound::Register => match status {
            Some(s) if s.has_submission_in_flight() => Route::ShowStatus,
            _ => Route::StartWizard,
        },
        Inbound::Cancel => match status {
            Some(Status::Collecting) => Route::CancelWizard,
            _ => Route::Ignore,
        },
        Inbound::Back => match status {
            Some(Status::Collecting) => Route::StepBack,
            _ => Route::Ignore,
        },
        Inbound::Status => match status {
            None => Route::Unregistered,
            Some(_) => Route::ShowStatus,
        },
        Inbound::Dashboard => match status {
            Some(Status::PaymentVerified) => Route::ShowDashboard,
            None => Route::Unregistered,
            Some(_) => Route::ShowStatus,
        },
        Inbound::PayNow => match status {
            Some(Status::Approved | Status::PendingPayment) => Route::InitiatePayment,
            Some(Status::PendingReview) => Route::AwaitReview,
            None => Route::Unregistered,
            Some(_) => Route::ShowStatus,
        },
        Inbound::Text(_) | Inbound::Contact { .. } => match status {
            Some(Status::Collecting) => Route::StepInput,
            Some(Status::PendingReview) => Route::AwaitReview,
            None | Some(Status::Idle) => Route::Unregistered,
            Some(_) => Route::Ignore,
        },
    }
}
