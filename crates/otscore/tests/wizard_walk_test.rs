//! Random walks over wizard events
//!
//! Whatever the applicant sends, the step only moves along one edge at a time
//! and the fields never hold unvalidated input.

mod common;

use chrono::Duration;
use rand::prelude::*;
use rand::rngs::StdRng;

use common::{t0, Harness};
use otscore::registration::types::{ApplicantId, Status, Step};
use otscore::registration::validation::{normalize_phone, StepInput};
use otscore::registration::wizard::BackOutcome;

const INPUTS: [&str; 12] = [
    "Jane Doe",
    "J",
    "0912345678",
    "12345",
    "https://youtube.com/@jane",
    "https://example.com",
    "skip",
    "jane@example.com",
    "not-an-email",
    "Mathematics",
    " ",
    "+251911000000",
];

#[derive(Debug, Clone, Copy)]
enum Action {
    Register,
    Back,
    Cancel,
    Input(usize),
}

fn ordinal(step: Step) -> i32 {
    match step {
        Step::None => 0,
        Step::Name => 1,
        Step::Phone => 2,
        Step::ChannelUrl => 3,
        Step::Email => 4,
        Step::Subject => 5,
        Step::Done => 6,
    }
}

#[tokio::test]
async fn steps_move_one_edge_at_a_time() {
    for seed in 1..=40u64 {
        let h = Harness::new();
        let id = ApplicantId(seed as i64);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut now = t0();

        for _ in 0..60 {
            now += Duration::seconds(10);
            let before = h.core.registry.get(id);
            let before_step = before.as_ref().map(|r| r.step).unwrap_or(Step::None);

            let action = match rng.random_range(0..10) {
                0 => Action::Register,
                1 => Action::Back,
                2 => Action::Cancel,
                _ => Action::Input(rng.random_range(0..INPUTS.len())),
            };

            match action {
                Action::Register => {
                    let _ = h.core.wizard.start(id, None, now).await;
                }
                Action::Back => {
                    if let Ok(outcome) = h.core.wizard.back(id, now).await {
                        if outcome == BackOutcome::AlreadyAtFirst {
                            assert_eq!(before_step, Step::None);
                        }
                    }
                }
                Action::Cancel => {
                    let _ = h.core.wizard.cancel(id, now).await;
                }
                Action::Input(i) => {
                    let _ = h.core.wizard.submit(id, StepInput::text(INPUTS[i]), now).await;
                }
            }

            let Some(after) = h.core.registry.get(id) else {
                continue;
            };
            let delta = ordinal(after.step) - ordinal(before_step);
            match action {
                // Registration restarts at the first step.
                Action::Register if after.status == Status::Collecting => {
                    assert_eq!(after.step, Step::Name, "seed {seed}");
                }
                Action::Cancel if after.status == Status::Idle => {
                    assert_eq!(after.step, Step::None, "seed {seed}");
                }
                _ => assert!((-1..=1).contains(&delta), "seed {seed}: {before_step} -> {}", after.step),
            }

            if let Some(phone) = &after.fields.phone {
                assert_eq!(normalize_phone(phone).as_deref(), Some(phone.as_str()), "seed {seed}");
            }
            if let Some(name) = &after.fields.name {
                assert!(name.trim().chars().count() >= 2, "seed {seed}");
            }
            match after.status {
                Status::PendingReview => assert_eq!(after.step, Step::Done),
                Status::Collecting => assert!(after.step.is_collecting(), "seed {seed}"),
                Status::Idle => assert_eq!(after.step, Step::None, "seed {seed}"),
                _ => {}
            }
        }
    }
}
