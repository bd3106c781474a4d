//! Snapshot and live rendering of codes for a set of keys.

use std::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::debug;

use crate::error::GauthError;
use crate::key::TotpKey;
use crate::prompt::{Style, UserInteraction};
use crate::store::KeyStore;
use crate::totp::{until_rollover, validity_remaining};

pub trait Clock {
    /// Time since the Unix epoch.
    fn now(&self) -> Duration;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(0))
    }
}

pub trait Sleeper {
    /// Blocks for `wait`. `Break` ends the live loop.
    fn sleep<U: UserInteraction>(&mut self, wait: Duration, ui: &mut U) -> ControlFlow<()>;
}

/// Sleeps second by second while drawing a validity bar.
pub struct CountdownSleeper;

impl Sleeper for CountdownSleeper {
    fn sleep<U: UserInteraction>(&mut self, wait: Duration, ui: &mut U) -> ControlFlow<()> {
        let total = wait.as_secs();
        for done in 0..total {
            ui.progress("Token Validity", done, total);
            thread::sleep(Duration::from_secs(1));
        }
        ui.progress("Token Validity", total, total);
        thread::sleep(wait - Duration::from_secs(total));
        ControlFlow::Continue(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the current codes once.
    Snapshot,
    /// Redraw previous/current/next codes at every rollover.
    Live,
}

/// One key's codes at a single instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeRow {
    pub name: String,
    pub previous: String,
    pub current: String,
    pub next: String,
    pub remaining: u64,
}

pub fn frame(keys: &[TotpKey], now: u64) -> Result<Vec<CodeRow>, GauthError> {
    keys.iter()
        .map(|key| {
            Ok(CodeRow {
                name: key.name.clone(),
                previous: key.code_at(now.saturating_sub(key.period))?,
                current: key.code_at(now)?,
                next: key.code_at(now.saturating_add(key.period))?,
                remaining: validity_remaining(key.period, now),
            })
        })
        .collect()
}

pub fn run<C, U, S>(
    store: &KeyStore,
    mode: Mode,
    clock: &C,
    ui: &mut U,
    sleeper: &mut S,
) -> Result<(), GauthError>
where
    C: Clock,
    U: UserInteraction,
    S: Sleeper,
{
    if store.is_empty() {
        ui.print_styled("No authenticator keys to display", Style::Notice);
        return Ok(());
    }

    let keys = store.entries();
    match mode {
        Mode::Snapshot => run_snapshot(keys, clock, ui),
        Mode::Live => run_live(keys, clock, ui, sleeper),
    }
}

pub fn run_snapshot<C, U>(keys: &[TotpKey], clock: &C, ui: &mut U) -> Result<(), GauthError>
where
    C: Clock,
    U: UserInteraction,
{
    let rows = frame(keys, clock.now().as_secs())?;

    ui.print_line(&format!("{:>8}{:>25}{:>20}", "TOTP", "Name", "Valid for"));
    for row in rows {
        ui.print_line(&format!(
            "{:>8}{:>25}{:>19}s",
            row.current, row.name, row.remaining
        ));
    }
    Ok(())
}

pub fn run_live<C, U, S>(
    keys: &[TotpKey],
    clock: &C,
    ui: &mut U,
    sleeper: &mut S,
) -> Result<(), GauthError>
where
    C: Clock,
    U: UserInteraction,
    S: Sleeper,
{
    // rollover the previous sleep aimed for; a frame is never drawn before it
    let mut not_before = Duration::ZERO;
    loop {
        let rows = frame(keys, clock.now().max(not_before).as_secs())?;

        ui.clear();
        ui.print_line("PREV\t\tCURRENT\t\tNEXT\t\tNAME");
        for row in &rows {
            let line = format!(
                "{}\t\t{}\t\t{}\t\t{}",
                ui.style(&row.previous, Style::Previous),
                ui.style(&row.current, Style::Current),
                ui.style(&row.next, Style::Next),
                row.name
            );
            ui.print_line(&line);
        }

        // periods may differ between keys, wake for the earliest rollover
        let now = clock.now().max(not_before);
        let wait = keys
            .iter()
            .map(|key| until_rollover(key.period, now))
            .min()
            .unwrap_or(Duration::ZERO);
        not_before = now + wait;
        debug!(keys = rows.len(), wait_ms = wait.as_millis() as u64, "rendered tick");

        if sleeper.sleep(wait, ui).is_break() {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeUi, FixedClock, StopAfter};
    use crate::uri;

    fn store(keys: Vec<TotpKey>) -> KeyStore {
        let mut store = KeyStore::new();
        for key in keys {
            store.add(key);
        }
        store
    }

    fn keys() -> Vec<TotpKey> {
        vec![
            TotpKey::new("JBSWY3DPEHPK3PXP").unwrap().with_name("first"),
            uri::parse("otpauth://totp/second?secret=GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ&period=60")
                .unwrap(),
        ]
    }

    #[test]
    fn frame_holds_adjacent_windows() {
        let rows = frame(&keys()[..1], 40).unwrap();
        let row = &rows[0];

        assert_eq!(row.previous, "282760");
        assert_eq!(row.current, "996554");
        assert_eq!(row.next, keys()[0].code_at(60).unwrap());
        assert_eq!(row.remaining, 20);
    }

    #[test]
    fn frame_remaining_is_per_key() {
        let rows = frame(&keys(), 45).unwrap();
        assert_eq!(rows[0].remaining, 15);
        assert_eq!(rows[1].remaining, 15);

        let rows = frame(&keys(), 75).unwrap();
        assert_eq!(rows[0].remaining, 15);
        assert_eq!(rows[1].remaining, 45);
    }

    #[test]
    fn previous_code_saturates_at_epoch() {
        let rows = frame(&keys()[..1], 10).unwrap();
        assert_eq!(rows[0].previous, rows[0].current);
    }

    #[test]
    fn snapshot_prints_one_table_and_returns() {
        let mut ui = FakeUi::new();
        let mut sleeper = StopAfter::new(1);

        run(
            &store(keys()),
            Mode::Snapshot,
            &FixedClock(Duration::from_secs(40)),
            &mut ui,
            &mut sleeper,
        )
        .unwrap();

        assert_eq!(ui.lines.len(), 3);
        assert!(ui.lines[0].contains("Valid for"));
        assert!(ui.lines[1].contains("996554"));
        assert!(ui.lines[1].contains("first"));
        assert!(ui.lines[1].ends_with("20s"));
        assert!(sleeper.waits.is_empty());
        assert_eq!(ui.clears, 0);
    }

    #[test]
    fn live_mode_waits_for_earliest_rollover() {
        let mut ui = FakeUi::new();
        let mut sleeper = StopAfter::new(2);

        run(
            &store(keys()),
            Mode::Live,
            &FixedClock(Duration::from_millis(75_500)),
            &mut ui,
            &mut sleeper,
        )
        .unwrap();

        assert_eq!(ui.clears, 2);
        assert_eq!(ui.lines.len(), 6);
        assert!(ui.lines[0].starts_with("PREV"));
        assert!(ui.lines[1].ends_with("first"));
        assert!(ui.lines[2].ends_with("second"));
        // first key rolls over at 90s, second at 120s
        assert_eq!(
            sleeper.waits,
            vec![Duration::from_millis(14_500), Duration::from_secs(30)]
        );
    }

    #[test]
    fn live_mode_sleeps_exactly_to_rollover_and_redraws_new_window() {
        let key = TotpKey::new("JBSWY3DPEHPK3PXP").unwrap().with_name("first");
        let mut ui = FakeUi::new();
        let mut sleeper = StopAfter::new(2);

        // the clock lags behind the sleep, as a coarse wall clock can
        run(
            &store(vec![key.clone()]),
            Mode::Live,
            &FixedClock(Duration::from_millis(29_990)),
            &mut ui,
            &mut sleeper,
        )
        .unwrap();

        assert_eq!(
            sleeper.waits,
            vec![Duration::from_millis(10), Duration::from_secs(30)]
        );
        assert!(ui.lines[1].contains("\t282760\t"), "{}", ui.lines[1]);
        assert_eq!(
            ui.lines[3],
            format!("282760\t\t996554\t\t{}\t\tfirst", key.code_at(60).unwrap())
        );
    }

    #[test]
    fn empty_store_prints_notice() {
        let mut ui = FakeUi::new();
        let mut sleeper = StopAfter::new(1);

        run(
            &KeyStore::new(),
            Mode::Live,
            &FixedClock(Duration::ZERO),
            &mut ui,
            &mut sleeper,
        )
        .unwrap();

        assert_eq!(ui.output(), "No authenticator keys to display");
        assert!(sleeper.waits.is_empty());
    }
}
