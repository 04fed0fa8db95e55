//! Chat front-end state machine.
//!
//! Every actor (an external chat identity) is in one [`ChatState`]. An
//! [`Inbound`] event is first routed to an [`Intent`] by the pure [`route`]
//! table; [`Conversation::handle`] then carries the intent out against the
//! services and stores the actor's next state.

use super::calculator::CompensationCalculator;
use super::directory::Directory;
use crate::domain::offering::{DayOfWeek, ScheduleSlot, SlotId};
use crate::domain::ports::{ClockRef, LinkOutcome};
use crate::domain::trainer::Trainer;
use crate::error::{PayrollError, Result};
use chrono::{Days, NaiveDate};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MENU_TODAY: &str = "Today's classes";
pub const MENU_YESTERDAY: &str = "Yesterday's classes";
pub const MENU_SALARY: &str = "Monthly salary";
pub const MENU_CANCEL: &str = "Cancel";

const CALLBACK_PREFIX: &str = "att";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    AwaitingPhone,
    Idle,
    AwaitingAttendanceCount {
        slot_id: SlotId,
        date: NaiveDate,
    },
}

/// An event from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// The `/start` command.
    Start,
    /// A shared contact card carrying a phone number.
    Contact(String),
    Text(String),
    /// Data attached to an inline button.
    Callback(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Today,
    Yesterday,
}

/// What an inbound event asks for, given the actor's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Restart,
    Verify(String),
    ListSlots(Day),
    ShowSalary,
    Cancel,
    Choose { slot_id: SlotId, date: NaiveDate },
    SubmitCount(String),
    Unrecognised,
}

/// The reply keyboard shown under the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    RequestContact,
    MainMenu,
    Cancel,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
    pub buttons: Vec<Button>,
}

impl Reply {
    fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
            buttons: Vec::new(),
        }
    }
}

/// Callback data of the button that selects `slot_id` on `date`.
pub fn slot_callback(slot_id: SlotId, date: NaiveDate) -> String {
    format!("{CALLBACK_PREFIX}:{slot_id}:{}", date.format("%Y-%m-%d"))
}

fn parse_slot_callback(data: &str) -> Option<(SlotId, NaiveDate)> {
    let mut parts = data.splitn(3, ':');
    if parts.next()? != CALLBACK_PREFIX {
        return None;
    }
    let slot_id = parts.next()?.parse().ok()?;
    let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
    Some((slot_id, date))
}

/// Parses a reported headcount: plain decimal digits only.
pub fn parse_attend_count(text: &str) -> Result<u32> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(PayrollError::validation(format!(
            "'{text}' is not a number"
        )));
    }
    text.parse()
        .map_err(|_| PayrollError::validation(format!("'{text}' is too large")))
}

/// The transition table. Menu entries and `/start` work from every state.
pub fn route(state: &ChatState, inbound: &Inbound) -> Intent {
    match inbound {
        Inbound::Start => Intent::Restart,
        Inbound::Contact(phone) => Intent::Verify(phone.clone()),
        Inbound::Callback(data) => match parse_slot_callback(data) {
            Some((slot_id, date)) => Intent::Choose { slot_id, date },
            None => Intent::Unrecognised,
        },
        Inbound::Text(text) => {
            let command = text.trim().to_lowercase();
            if command == MENU_TODAY.to_lowercase() {
                Intent::ListSlots(Day::Today)
            } else if command == MENU_YESTERDAY.to_lowercase() {
                Intent::ListSlots(Day::Yesterday)
            } else if command == MENU_SALARY.to_lowercase() {
                Intent::ShowSalary
            } else if command == MENU_CANCEL.to_lowercase() {
                Intent::Cancel
            } else if matches!(state, ChatState::AwaitingAttendanceCount { .. }) {
                Intent::SubmitCount(text.clone())
            } else {
                Intent::Unrecognised
            }
        }
    }
}

/// Per-actor chat sessions over the directory and the calculator.
///
/// Only actors away from the default [`ChatState::AwaitingPhone`] keep an
/// entry. Leaving that state takes a verified phone, so the table holds at
/// most one entry per linked trainer.
#[derive(Clone)]
pub struct Conversation {
    directory: Directory,
    calculator: CompensationCalculator,
    clock: ClockRef,
    currency: String,
    states: Arc<RwLock<HashMap<String, ChatState>>>,
}

impl Conversation {
    pub fn new(
        directory: Directory,
        calculator: CompensationCalculator,
        clock: ClockRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            calculator,
            clock,
            currency: currency.into(),
            states: Arc::default(),
        }
    }

    pub async fn state(&self, actor: &str) -> ChatState {
        self.states
            .read()
            .await
            .get(actor)
            .cloned()
            .unwrap_or_default()
    }

    /// Handles one event from `actor` and returns the reply to send back.
    pub async fn handle(&self, actor: &str, inbound: Inbound) -> Reply {
        let state = self.state(actor).await;
        let intent = route(&state, &inbound);
        debug!("actor {actor} in {state:?} -> {intent:?}");

        let (next, reply) = match self.execute(actor, &state, intent).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("request from {actor} failed: {e}");
                (
                    state,
                    Reply::new(
                        "Something went wrong, please try again later.",
                        Keyboard::Unchanged,
                    ),
                )
            }
        };
        let mut states = self.states.write().await;
        if next == ChatState::default() {
            states.remove(actor);
        } else {
            states.insert(actor.to_string(), next);
        }
        reply
    }

    async fn execute(
        &self,
        actor: &str,
        state: &ChatState,
        intent: Intent,
    ) -> Result<(ChatState, Reply)> {
        match intent {
            Intent::Restart => Ok((
                ChatState::AwaitingPhone,
                Reply::new("Please send your phone number.", Keyboard::RequestContact),
            )),
            Intent::Verify(phone) => self.verify(actor, &phone).await,
            Intent::Cancel => match state {
                ChatState::AwaitingPhone => Ok((
                    ChatState::AwaitingPhone,
                    Reply::new("Cancelled.", Keyboard::RequestContact),
                )),
                _ => Ok((
                    ChatState::Idle,
                    Reply::new("Cancelled.", Keyboard::MainMenu),
                )),
            },
            Intent::Unrecognised => Ok((
                state.clone(),
                Reply::new("Sorry, I don't understand you.", Keyboard::Unchanged),
            )),
            Intent::ListSlots(day) => match self.linked_trainer(actor).await? {
                Some(trainer) => self.list_slots(&trainer, day).await,
                None => Ok(Self::unknown_actor()),
            },
            Intent::ShowSalary => match self.linked_trainer(actor).await? {
                Some(trainer) => {
                    let statement = self.calculator.monthly_salary(trainer.id).await?;
                    Ok((
                        ChatState::Idle,
                        Reply::new(
                            format!(
                                "Your salary for the current month is: {} {}",
                                statement.total, self.currency
                            ),
                            Keyboard::MainMenu,
                        ),
                    ))
                }
                None => Ok(Self::unknown_actor()),
            },
            Intent::Choose { slot_id, date } => match self.linked_trainer(actor).await? {
                Some(trainer) => match self.session_slot(&trainer, slot_id, date).await? {
                    Some(_) => Ok((
                        ChatState::AwaitingAttendanceCount { slot_id, date },
                        Reply::new(
                            format!("Enter the number of attendees for the class on {date}."),
                            Keyboard::Cancel,
                        ),
                    )),
                    None => Ok(Self::class_not_found()),
                },
                None => Ok(Self::unknown_actor()),
            },
            Intent::SubmitCount(text) => match state {
                ChatState::AwaitingAttendanceCount { slot_id, date } => {
                    match self.linked_trainer(actor).await? {
                        Some(trainer) => {
                            self.submit_count(state, &trainer, *slot_id, *date, &text)
                                .await
                        }
                        None => Ok(Self::unknown_actor()),
                    }
                }
                _ => Ok((
                    state.clone(),
                    Reply::new("Sorry, I don't understand you.", Keyboard::Unchanged),
                )),
            },
        }
    }

    async fn verify(&self, actor: &str, phone: &str) -> Result<(ChatState, Reply)> {
        let trainer = match self.directory.verify_phone(phone).await {
            Ok(trainer) => trainer,
            Err(PayrollError::NotFound { .. } | PayrollError::ValidationError(_)) => {
                return Ok((
                    ChatState::AwaitingPhone,
                    Reply::new(
                        "Your phone number is not registered in the system.",
                        Keyboard::RequestContact,
                    ),
                ));
            }
            Err(e) => return Err(e),
        };
        let text = match self.directory.link_identity(&trainer, actor).await {
            Ok(LinkOutcome::Linked) => "Your phone number has been saved.",
            Ok(LinkOutcome::AlreadyLinked) => "Your phone number is already registered.",
            Err(PayrollError::ConflictError(reason)) => {
                warn!("refused to link {actor} to trainer {}: {reason}", trainer.id);
                return Ok((
                    ChatState::AwaitingPhone,
                    Reply::new(
                        "This phone number is linked to another account.",
                        Keyboard::RequestContact,
                    ),
                ));
            }
            Err(e) => return Err(e),
        };
        Ok((ChatState::Idle, Reply::new(text, Keyboard::MainMenu)))
    }

    async fn list_slots(&self, trainer: &Trainer, day: Day) -> Result<(ChatState, Reply)> {
        let today = self.clock.today();
        let date = match day {
            Day::Today => today,
            Day::Yesterday => today.checked_sub_days(Days::new(1)).unwrap_or(today),
        };
        let slots = self.directory.slots_for_date(trainer.id, date).await?;
        let (empty, header) = match day {
            Day::Today => ("You have no classes today.", "Your classes for today:"),
            Day::Yesterday => ("You had no classes yesterday.", "Your classes yesterday:"),
        };
        if slots.is_empty() {
            return Ok((ChatState::Idle, Reply::new(empty, Keyboard::MainMenu)));
        }
        let mut reply = Reply::new(header, Keyboard::MainMenu);
        reply.buttons = slots
            .iter()
            .map(|view| Button {
                label: view.to_string(),
                data: slot_callback(view.slot.id, date),
            })
            .collect();
        Ok((ChatState::Idle, reply))
    }

    async fn submit_count(
        &self,
        state: &ChatState,
        trainer: &Trainer,
        slot_id: SlotId,
        date: NaiveDate,
        text: &str,
    ) -> Result<(ChatState, Reply)> {
        let count = match parse_attend_count(text) {
            Ok(count) => count,
            Err(_) => {
                return Ok((
                    state.clone(),
                    Reply::new("Please enter a number.", Keyboard::Cancel),
                ));
            }
        };
        // The slot may have been reassigned since the button was pressed.
        if self.session_slot(trainer, slot_id, date).await?.is_none() {
            return Ok(Self::class_not_found());
        }
        match self.calculator.record_attendance(slot_id, date, count).await {
            Ok(record) => Ok((
                ChatState::Idle,
                Reply::new(
                    format!("Attendance recorded: {record}"),
                    Keyboard::MainMenu,
                ),
            )),
            Err(PayrollError::NotFound { .. }) => Ok(Self::class_not_found()),
            Err(e) => Err(e),
        }
    }

    /// The slot behind a button press, if `trainer` teaches it and a session of
    /// it took place on `date`: same weekday, offering running, not in the future.
    async fn session_slot(
        &self,
        trainer: &Trainer,
        slot_id: SlotId,
        date: NaiveDate,
    ) -> Result<Option<ScheduleSlot>> {
        let (slot, offering) = match self.directory.trainer_slot(trainer.id, slot_id).await {
            Ok(found) => found,
            Err(PayrollError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let held = DayOfWeek::of(date) == slot.day_of_week
            && offering.is_active_on(date)
            && date <= self.clock.today();
        if !held {
            debug!("slot {slot_id} had no session on {date}");
        }
        Ok(held.then_some(slot))
    }

    async fn linked_trainer(&self, actor: &str) -> Result<Option<Trainer>> {
        self.directory.trainer_by_chat_id(actor).await
    }

    fn class_not_found() -> (ChatState, Reply) {
        (
            ChatState::Idle,
            Reply::new("Error: class not found.", Keyboard::MainMenu),
        )
    }

    fn unknown_actor() -> (ChatState, Reply) {
        (
            ChatState::AwaitingPhone,
            Reply::new(
                "Your phone number was not found. Use /start",
                Keyboard::RequestContact,
            ),
        )
    }
}
