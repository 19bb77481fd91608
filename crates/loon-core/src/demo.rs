//! A small card draft, enough to drive a real session end to end.
//!
//! Players take turns picking one card from a shared pool, or answer with
//! the extra option `pass`. The game ends when the pool is empty or every
//! seat passed in a row. Events:
//! - `CardDrafted { player, card }`, `first` only for the drafting seat,
//! - `PlayerPassed { player }`,
//! - `GameOver { hands }`.

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::engine::{GameEngine, GameInterface, Seat, SetupInfo};
use crate::error::EngineError;
use crate::event::GameEvent;
use crate::option::{Artifact, GameOption, Selectable};
use crate::selection::Choice;

/// Name of the extra option that skips a turn.
pub const PASS: &str = "pass";

/// Pool used by [`DraftGame::new`]: `(name, cost)`.
pub const DEFAULT_POOL: &[(&str, u32)] = &[
    ("Copper", 0),
    ("Silver", 3),
    ("Gold", 6),
    ("Estate", 2),
    ("Duchy", 5),
    ("Province", 8),
    ("Village", 3),
    ("Smithy", 4),
];

#[derive(Debug)]
pub struct Card {
    id: usize,
    name: String,
    cost: u32,
}

impl Artifact for Card {
    fn name(&self) -> &str {
        &self.name
    }

    fn serialize(&self, _observer: Seat) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".into(), Value::from(self.id));
        map.insert("name".into(), Value::from(self.name.as_str()));
        map.insert("cost".into(), Value::from(self.cost));
        map
    }
}

#[derive(Debug)]
struct CardDrafted {
    seat: Seat,
    card: GameOption,
}

impl GameEvent for CardDrafted {
    fn event_type(&self) -> &str {
        "CardDrafted"
    }

    fn values(&self, observer: Seat) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("player".into(), Value::from(self.seat.0));
        map.insert("card".into(), self.card.to_json(observer));
        map
    }
}

#[derive(Debug)]
struct PlayerPassed {
    seat: Seat,
}

impl GameEvent for PlayerPassed {
    fn event_type(&self) -> &str {
        "PlayerPassed"
    }

    fn values(&self, _observer: Seat) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("player".into(), Value::from(self.seat.0));
        map
    }
}

#[derive(Debug)]
struct GameOver<'a> {
    hands: &'a [Vec<String>],
}

impl GameEvent for GameOver<'_> {
    fn event_type(&self) -> &str {
        "GameOver"
    }

    fn values(&self, _observer: Seat) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("hands".into(), Value::from(self.hands.to_vec()));
        map
    }
}

#[derive(Debug)]
pub struct DraftGame {
    seats: usize,
    pool: Vec<GameOption>,
    hands: Vec<Vec<String>>,
}

impl DraftGame {
    pub fn new(setup: &SetupInfo) -> Self {
        Self::with_pool(setup, DEFAULT_POOL.iter().copied())
    }

    pub fn with_pool<'a>(
        setup: &SetupInfo,
        cards: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Self {
        let pool = cards
            .into_iter()
            .enumerate()
            .map(|(id, (name, cost))| {
                GameOption::artifact(Card {
                    id,
                    name: name.to_string(),
                    cost,
                })
            })
            .collect();

        DraftGame {
            seats: setup.num_players,
            pool,
            hands: vec![Vec::new(); setup.num_players],
        }
    }

    /// Card names drafted so far, per seat.
    pub fn hands(&self) -> &[Vec<String>] {
        &self.hands
    }

    fn announce(&self, io: &dyn GameInterface, event: &dyn GameEvent, actor: Seat) {
        for seat in (0..self.seats).map(Seat) {
            io.notify_event(seat, event, seat == actor);
        }
    }
}

impl GameEngine for DraftGame {
    fn run(&mut self, io: &dyn GameInterface) -> Result<(), EngineError> {
        if self.seats == 0 {
            return Err(EngineError::NoPlayers);
        }

        let mut turn = 0;
        let mut passes_in_a_row = 0;

        while !self.pool.is_empty() && passes_in_a_row < self.seats {
            let seat = Seat(turn % self.seats);
            turn += 1;

            let choice = io.select_option(
                seat,
                self.pool.clone(),
                false,
                vec![GameOption::text(PASS)],
                Some("draft a card"),
            );

            match choice {
                Some(Choice::Picked(card)) => {
                    let index = self
                        .pool
                        .iter()
                        .position(|option| option == &card)
                        .ok_or_else(|| {
                            EngineError::Internal(format!("{} is not in the pool", card.label()))
                        })?;
                    self.pool.remove(index);
                    self.hands[seat.0].push(card.label());
                    passes_in_a_row = 0;

                    debug!(%seat, card = %card.label(), "card drafted");
                    self.announce(io, &CardDrafted { seat, card }, seat);
                }
                Some(Choice::Additional(_)) | None => {
                    passes_in_a_row += 1;
                    debug!(%seat, "seat passed");
                    self.announce(io, &PlayerPassed { seat }, seat);
                }
            }
        }

        info!(turns = turn, "draft finished");
        let hands = self.hands.clone();
        for seat in (0..self.seats).map(Seat) {
            io.notify_event(seat, &GameOver { hands: &hands }, true);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;
    use crate::engine::PlayerIo;
    use crate::messages::{EventRecord, SelectRequest};
    use crate::selection::{Selection, SelectionEngine};

    /// In-memory table: scripted answers per seat, recorded events per seat.
    #[derive(Default)]
    struct Table {
        answers: Mutex<HashMap<Seat, VecDeque<&'static str>>>,
        events: Mutex<Vec<(Seat, EventRecord, bool)>>,
    }

    struct SeatIo<'a> {
        table: &'a Table,
        seat: Seat,
    }

    impl PlayerIo for SeatIo<'_> {
        fn select(&self, _request: &SelectRequest) -> String {
            let mut answers = self.table.answers.lock().unwrap();
            answers
                .get_mut(&self.seat)
                .and_then(VecDeque::pop_front)
                .expect("seat ran out of answers")
                .to_string()
        }
    }

    impl Table {
        fn script(&self, seat: usize, answers: &[&'static str]) {
            self.answers
                .lock()
                .unwrap()
                .insert(Seat(seat), answers.iter().copied().collect());
        }

        fn events_for(&self, seat: usize) -> Vec<(String, bool)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _, _)| *s == Seat(seat))
                .map(|(_, record, first)| (record.event_type.clone(), *first))
                .collect()
        }
    }

    impl GameInterface for Table {
        fn select_options(
            &self,
            seat: Seat,
            options: Vec<GameOption>,
            minimum: Option<usize>,
            maximum: Option<usize>,
            additional: Vec<GameOption>,
            reason: Option<&str>,
        ) -> Selection<GameOption> {
            let io = SeatIo { table: self, seat };
            SelectionEngine::new()
                .select_options(&io, options, minimum, maximum, additional, reason)
        }

        fn notify_event(&self, seat: Seat, event: &dyn GameEvent, first: bool) {
            self.events
                .lock()
                .unwrap()
                .push((seat, EventRecord::render(event, seat), first));
        }
    }

    fn small_pool(players: usize) -> DraftGame {
        DraftGame::with_pool(
            &SetupInfo { num_players: players },
            [("Copper", 0), ("Silver", 3), ("Gold", 6)],
        )
    }

    #[test]
    fn seats_alternate_until_the_pool_is_empty() {
        let table = Table::default();
        table.script(0, &["g", "c"]);
        table.script(1, &["s"]);

        let mut game = small_pool(2);
        game.run(&table).unwrap();

        assert_eq!(game.hands(), &[vec!["Gold", "Copper"], vec!["Silver"]]);
    }

    #[test]
    fn drafting_seat_gets_first_occurrence() {
        let table = Table::default();
        table.script(0, &["gold", "c"]);
        table.script(1, &["s"]);

        small_pool(2).run(&table).unwrap();

        let seat0 = table.events_for(0);
        let seat1 = table.events_for(1);
        assert_eq!(seat0[0], ("CardDrafted".to_string(), true));
        assert_eq!(seat1[0], ("CardDrafted".to_string(), false));
        assert_eq!(seat0.last().unwrap().0, "GameOver");
    }

    #[test]
    fn everyone_passing_ends_the_game() {
        let table = Table::default();
        table.script(0, &["pass"]);
        table.script(1, &["-p"]);

        let mut game = small_pool(2);
        game.run(&table).unwrap();

        assert!(game.hands().iter().all(Vec::is_empty));
        assert_eq!(
            table.events_for(0),
            vec![
                ("PlayerPassed".to_string(), true),
                ("PlayerPassed".to_string(), false),
                ("GameOver".to_string(), true),
            ]
        );
    }

    #[test]
    fn card_values_carry_attributes() {
        let table = Table::default();
        table.script(0, &["sil", "g", "c"]);

        small_pool(1).run(&table).unwrap();

        let events = table.events.lock().unwrap();
        let (_, record, _) = &events[0];
        assert_eq!(record.values["player"], 0);
        assert_eq!(record.values["card"]["name"], "Silver");
        assert_eq!(record.values["card"]["cost"], 3);
    }

    #[test]
    fn no_seats_is_an_error() {
        let table = Table::default();
        let result = small_pool(0).run(&table);

        assert!(matches!(result, Err(EngineError::NoPlayers)));
    }
}
