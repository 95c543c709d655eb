use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::ShowingKey;
use crate::store::BookingStore;
use crate::utils::error::AppError;

pub const SEAT_ROWS: [char; 3] = ['A', 'B', 'C'];
pub const SEATS_PER_ROW: u8 = 5;

/// Every seat label of a screen, row by row: `A1..A5, B1..B5, C1..C5`.
pub fn seat_universe() -> Vec<String> {
    SEAT_ROWS
        .iter()
        .flat_map(|row| (1..=SEATS_PER_ROW).map(move |n| format!("{row}{n}")))
        .collect()
}

pub fn is_valid_seat(label: &str) -> bool {
    let mut chars = label.chars();
    let (Some(row), Some(number), None) = (chars.next(), chars.next(), chars.next()) else {
        return false;
    };
    SEAT_ROWS.contains(&row)
        && number
            .to_digit(10)
            .is_some_and(|n| (1..=u32::from(SEATS_PER_ROW)).contains(&n))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatStatus {
    pub seat: String,
    #[serde(rename = "isBooked")]
    pub is_booked: bool,
}

/// Answers which seats of a showing are still free. Seats are never stored;
/// a seat is booked when a transaction seat claims it for that exact movie
/// and showing.
#[derive(Clone)]
pub struct SeatInventory {
    bookings: Arc<dyn BookingStore>,
}

impl SeatInventory {
    pub fn new(bookings: Arc<dyn BookingStore>) -> Self {
        Self { bookings }
    }

    pub async fn booked_seats(
        &self,
        movie_id: Uuid,
        showing: &ShowingKey,
    ) -> Result<Vec<String>, AppError> {
        let mut booked = self.bookings.booked_seats(movie_id, showing).await?;
        booked.sort();
        booked.dedup();
        Ok(booked)
    }

    pub async fn available_seats(
        &self,
        movie_id: Uuid,
        showing: &ShowingKey,
    ) -> Result<Vec<String>, AppError> {
        let booked: HashSet<String> = self
            .bookings
            .booked_seats(movie_id, showing)
            .await?
            .into_iter()
            .collect();

        Ok(seat_universe()
            .into_iter()
            .filter(|seat| !booked.contains(seat))
            .collect())
    }

    pub async fn seat_map(
        &self,
        movie_id: Uuid,
        showing: &ShowingKey,
    ) -> Result<Vec<SeatStatus>, AppError> {
        let booked: HashSet<String> = self
            .bookings
            .booked_seats(movie_id, showing)
            .await?
            .into_iter()
            .collect();

        Ok(seat_universe()
            .into_iter()
            .map(|seat| SeatStatus {
                is_booked: booked.contains(&seat),
                seat,
            })
            .collect())
    }
}

/// Seat map of a showing nobody has booked yet.
pub fn empty_seat_map() -> Vec<SeatStatus> {
    seat_universe()
        .into_iter()
        .map(|seat| SeatStatus {
            seat,
            is_booked: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_is_fifteen_labels_in_order() {
        let seats = seat_universe();
        assert_eq!(seats.len(), 15);
        assert_eq!(seats.first().map(String::as_str), Some("A1"));
        assert_eq!(seats[5], "B1");
        assert_eq!(seats.last().map(String::as_str), Some("C5"));
    }

    #[test]
    fn test_seat_labels() {
        assert!(is_valid_seat("A1"));
        assert!(is_valid_seat("C5"));
        assert!(!is_valid_seat("D1"));
        assert!(!is_valid_seat("A6"));
        assert!(!is_valid_seat("A0"));
        assert!(!is_valid_seat("A10"));
        assert!(!is_valid_seat("a1"));
        assert!(!is_valid_seat(""));
    }

    #[test]
    fn test_empty_map_is_all_free() {
        let map = empty_seat_map();
        assert_eq!(map.len(), 15);
        assert!(map.iter().all(|status| !status.is_booked));
    }
}
