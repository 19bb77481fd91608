//! Option selection: "choose N of M" over a free-text answer channel.
//!
//! One call runs up to `maximum` rounds. Each round sends the player the
//! remaining candidate labels (plus the [`DONE`] sentinel once more than
//! `minimum` items are picked, plus the extra-option labels) and matches
//! the raw answer against them:
//!
//! 1. A leading `-` restricts the answer to extra options.
//! 2. `DONE` ends the call early, only once it is on offer.
//! 3. Otherwise the first candidate, in order, whose label matches is
//!    picked and the next round starts.
//! 4. While nothing is picked yet, a matching extra option is returned
//!    in place of the whole selection.
//! 5. An answer matching nothing asks the same question again.
//!
//! Matching is first-match-wins over an ordered scan, not best-match.

use tracing::debug;

use crate::engine::PlayerIo;
use crate::messages::SelectRequest;
use crate::option::Selectable;

/// Reserved answer that ends a multi-pick selection.
pub const DONE: &str = "DONE";

/// Decides whether a player's answer selects a label.
pub trait LabelMatcher {
    fn matches(&self, label: &str, response: &str) -> bool;
}

/// Case-insensitive prefix match: the label must start with the answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixMatcher;

impl LabelMatcher for PrefixMatcher {
    fn matches(&self, label: &str, response: &str) -> bool {
        label.to_lowercase().starts_with(&response.to_lowercase())
    }
}

/// Outcome of a multi-pick selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<O> {
    /// Candidates in the order they were picked.
    Picked(Vec<O>),

    /// An extra option chosen before any pick.
    Additional(O),
}

/// Outcome of a single pick.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice<O> {
    Picked(O),
    Additional(O),
}

impl<O> Selection<O> {
    /// Collapse a selection run with a maximum of one. `None` when nothing
    /// was picked.
    pub fn into_choice(self) -> Option<Choice<O>> {
        match self {
            Selection::Picked(picks) => picks.into_iter().next().map(Choice::Picked),
            Selection::Additional(extra) => Some(Choice::Additional(extra)),
        }
    }
}

/// `minimum` of a single pick.
pub(crate) fn single_minimum(optional: bool) -> usize {
    if optional {
        0
    } else {
        1
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionEngine<M = PrefixMatcher> {
    matcher: M,
}

impl SelectionEngine<PrefixMatcher> {
    pub fn new() -> Self {
        SelectionEngine::default()
    }
}

impl<M: LabelMatcher> SelectionEngine<M> {
    pub fn with_matcher(matcher: M) -> Self {
        SelectionEngine { matcher }
    }

    /// Run a selection against `player`.
    ///
    /// `minimum` defaults to 1 and `maximum` to the number of candidates.
    pub fn select_options<P, O>(
        &self,
        player: &P,
        options: Vec<O>,
        minimum: Option<usize>,
        maximum: Option<usize>,
        additional: Vec<O>,
        reason: Option<&str>,
    ) -> Selection<O>
    where
        P: PlayerIo + ?Sized,
        O: Selectable,
    {
        let mut remaining = options;
        let mut extras: Vec<(String, O)> = additional
            .into_iter()
            .map(|option| (option.label(), option))
            .collect();
        let extra_labels: Vec<String> = extras.iter().map(|(label, _)| label.clone()).collect();

        let minimum = minimum.unwrap_or(1);
        let maximum = maximum.unwrap_or(remaining.len());

        let mut picked: Vec<O> = Vec::new();

        for _ in 0..maximum {
            let done_offered = picked.len() > minimum;

            // No answer could ever match: every candidate is gone, stopping
            // is not on offer and extras are closed or absent.
            if remaining.is_empty() && !done_offered && (!picked.is_empty() || extras.is_empty()) {
                debug!(picked = picked.len(), "nothing left to select");
                break;
            }

            let mut labels: Vec<String> = remaining.iter().map(Selectable::label).collect();
            if done_offered {
                labels.push(DONE.to_string());
            }

            let request = SelectRequest {
                options: labels,
                additional_options: extra_labels.clone(),
                reason: reason.map(str::to_string),
            };

            loop {
                let response = player.select(&request);

                let (choice, extras_only) = match response.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (response.as_str(), false),
                };

                if done_offered && !choice.is_empty() && self.matcher.matches(DONE, choice) {
                    return Selection::Picked(picked);
                }

                if !extras_only {
                    let hit = remaining
                        .iter()
                        .position(|option| self.matcher.matches(&option.label(), choice));
                    if let Some(index) = hit {
                        picked.push(remaining.remove(index));
                        break;
                    }
                }

                if picked.is_empty() {
                    let hit = extras
                        .iter()
                        .position(|(label, _)| self.matcher.matches(label, choice));
                    if let Some(index) = hit {
                        return Selection::Additional(extras.swap_remove(index).1);
                    }
                }

                debug!(%response, "answer matched no option, asking again");
            }
        }

        Selection::Picked(picked)
    }

    /// Pick exactly one option (`optional` lowers the minimum to zero).
    pub fn select_one<P, O>(
        &self,
        player: &P,
        options: Vec<O>,
        optional: bool,
        additional: Vec<O>,
        reason: Option<&str>,
    ) -> Option<Choice<O>>
    where
        P: PlayerIo + ?Sized,
        O: Selectable,
    {
        let minimum = single_minimum(optional);
        self.select_options(player, options, Some(minimum), Some(1), additional, reason)
            .into_choice()
    }
}
