//! Turns a fulfilled booking response into a confirmation for the user.

use crate::lex::{BotResponse, DialogState};

pub const BOOK_HOTEL_INTENT: &str = "BookTripBookHotel";
pub const BOOK_CAR_INTENT: &str = "BookTripBookCar";

const CHECK_IN_DATE: &str = "BookTripCheckInDate";
const LOCATION: &str = "BookTripLocation";
const NIGHTS: &str = "BookTripNights";
const ROOM_TYPE: &str = "BookTripRoomType";

const CAR_TYPE: &str = "BookTripCarType";
const PICK_UP_CITY: &str = "BookTripPickUpCity";
const PICK_UP_DATE: &str = "BookTripPickUpDate";

/// Intents the client knows how to confirm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent<'a> {
    BookHotel,
    BookCar,
    Unrecognized(&'a str),
}

impl<'a> Intent<'a> {
    pub fn from_name(name: &'a str) -> Self {
        match name {
            BOOK_HOTEL_INTENT => Intent::BookHotel,
            BOOK_CAR_INTENT => Intent::BookCar,
            other => Intent::Unrecognized(other),
        }
    }

    fn name(&self) -> &'a str {
        match self {
            Intent::BookHotel => BOOK_HOTEL_INTENT,
            Intent::BookCar => BOOK_CAR_INTENT,
            Intent::Unrecognized(name) => name,
        }
    }
}

/// How the UI must surface a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Persistent banner only
    Banner,
    /// Banner plus a modal the user has to dismiss
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub text: String,
    pub acknowledgement: Acknowledgement,
}

/// Build the booking confirmation for a response, if it warrants one.
///
/// Only fulfilled hotel and car bookings confirm. A recognized intent with
/// a missing slot logs a warning and yields `None`.
pub fn interpret(response: &BotResponse) -> Option<Confirmation> {
    if response.dialog_state != DialogState::Fulfilled {
        return None;
    }

    let intent = Intent::from_name(response.intent_name.as_deref().unwrap_or_default());
    let slot = |name: &'static str| {
        let value = response.slot(name);
        if value.is_none() {
            tracing::warn!(
                intent = intent.name(),
                slot = name,
                "Fulfilled intent is missing a slot"
            );
        }
        value
    };

    match intent {
        Intent::BookHotel => {
            let check_in_date = slot(CHECK_IN_DATE)?;
            let location = slot(LOCATION)?;
            let nights = slot(NIGHTS)?;
            let room_type = slot(ROOM_TYPE)?;
            Some(Confirmation {
                text: format!(
                    "Congratulations! Your trip to {} with a {} room on {} for {} days has been booked!!",
                    location, room_type, check_in_date, nights
                ),
                acknowledgement: Acknowledgement::Banner,
            })
        }
        Intent::BookCar => {
            let car_type = slot(CAR_TYPE)?;
            let pick_up_city = slot(PICK_UP_CITY)?;
            let pick_up_date = slot(PICK_UP_DATE)?;
            Some(Confirmation {
                text: format!(
                    "Congratulations! Your {} for pick up in {} on {} has been reserved!",
                    car_type, pick_up_city, pick_up_date
                ),
                acknowledgement: Acknowledgement::Blocking,
            })
        }
        Intent::Unrecognized(name) => {
            tracing::debug!(intent = name, "No confirmation for fulfilled intent");
            None
        }
    }
}
