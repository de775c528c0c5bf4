use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::Sender;

/// The value pushed to a readout after every accepted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadoutUpdate {
    pub label: String,
    pub value: String,
    pub unit: String,
}

impl ReadoutUpdate {
    pub fn new(label: &str, value: f64, unit: &str) -> Self {
        Self {
            label: label.to_string(),
            value: format_whole(value),
            unit: unit.to_string(),
        }
    }
}

/// Nearest whole unit, without a "-0".
pub fn format_whole(value: f64) -> String {
    let rounded = value.round() as i64;
    rounded.to_string()
}

/// One-way sink for value and press notifications.
pub trait Readout {
    fn value_changed(&mut self, update: &ReadoutUpdate);

    /// Fired once per actual press or release.
    fn press_changed(&mut self, _pressed: bool) {}
}

impl<R: Readout + ?Sized> Readout for Rc<RefCell<R>> {
    fn value_changed(&mut self, update: &ReadoutUpdate) {
        self.borrow_mut().value_changed(update);
    }

    fn press_changed(&mut self, pressed: bool) {
        self.borrow_mut().press_changed(pressed);
    }
}

impl Readout for Vec<ReadoutUpdate> {
    fn value_changed(&mut self, update: &ReadoutUpdate) {
        self.push(update.clone());
    }
}

/// Forwards updates to another thread. A closed channel is silently ignored.
#[derive(Debug, Clone)]
pub struct ChannelReadout {
    sender: Sender<ReadoutUpdate>,
}

impl ChannelReadout {
    pub fn new(sender: Sender<ReadoutUpdate>) -> Self {
        Self { sender }
    }
}

impl Readout for ChannelReadout {
    fn value_changed(&mut self, update: &ReadoutUpdate) {
        if self.sender.send(update.clone()).is_err() {
            log::trace!("readout channel closed, dropping update");
        }
    }
}

/// Delivers every notification to each inner readout in order.
#[derive(Default)]
pub struct Fanout {
    readouts: Vec<Box<dyn Readout>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, readout: Box<dyn Readout>) -> Self {
        self.readouts.push(readout);
        self
    }
}

impl Readout for Fanout {
    fn value_changed(&mut self, update: &ReadoutUpdate) {
        for readout in &mut self.readouts {
            readout.value_changed(update);
        }
    }

    fn press_changed(&mut self, pressed: bool) {
        for readout in &mut self.readouts {
            readout.press_changed(pressed);
        }
    }
}

// ============================================================================
// MONITOR PANEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorCard {
    pub label: String,
    pub value: String,
    pub unit: String,
    pub faded: bool,
}

impl MonitorCard {
    pub fn new(label: &str, value: &str, unit: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            unit: unit.to_string(),
            faded: false,
        }
    }

    pub fn faded(mut self) -> Self {
        self.faded = true;
        self
    }

    pub fn display(&self) -> String {
        format!("{}{}", self.value, self.unit)
    }
}

/// Stack of labelled value cards, drawn beside the tape.
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    cards: Vec<MonitorCard>,
}

impl Monitor {
    pub fn new(cards: Vec<MonitorCard>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[MonitorCard] {
        &self.cards
    }

    pub fn card(&self, label: &str) -> Option<&MonitorCard> {
        self.cards.iter().find(|card| card.label == label)
    }
}

impl Readout for Monitor {
    fn value_changed(&mut self, update: &ReadoutUpdate) {
        match self.cards.iter_mut().find(|card| card.label == update.label) {
            Some(card) => {
                card.value.clone_from(&update.value);
                card.unit.clone_from(&update.unit);
            }
            None => self
                .cards
                .push(MonitorCard::new(&update.label, &update.value, &update.unit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn format_rounds_to_whole_units() {
        assert_eq!(format_whole(129.6), "130");
        assert_eq!(format_whole(0.2), "0");
        assert_eq!(format_whole(200.0), "200");
    }

    #[test]
    fn monitor_updates_matching_card_only() {
        let mut monitor = Monitor::new(vec![
            MonitorCard::new("Humidity", "45", "%").faded(),
            MonitorCard::new("Temperature", "0", "°C"),
        ]);
        monitor.value_changed(&ReadoutUpdate::new("Temperature", 130.0, "°C"));
        assert_eq!(monitor.card("Temperature").map(|c| c.display()), Some("130°C".to_string()));
        assert_eq!(monitor.card("Humidity").map(|c| c.value.as_str()), Some("45"));
        assert!(monitor.card("Humidity").is_some_and(|c| c.faded));
    }

    #[test]
    fn monitor_appends_unknown_label() {
        let mut monitor = Monitor::default();
        monitor.value_changed(&ReadoutUpdate::new("Pressure", 3.0, "bar"));
        assert_eq!(monitor.cards().len(), 1);
        assert_eq!(monitor.cards()[0].display(), "3bar");
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let first = Rc::new(RefCell::new(Vec::<ReadoutUpdate>::new()));
        let second = Rc::new(RefCell::new(Monitor::default()));
        let mut fanout = Fanout::new()
            .with(Box::new(Rc::clone(&first)))
            .with(Box::new(Rc::clone(&second)));
        fanout.value_changed(&ReadoutUpdate::new("Temperature", 7.0, "°C"));
        assert_eq!(first.borrow().len(), 1);
        assert_eq!(second.borrow().cards()[0].value, "7");
    }

    #[test]
    fn channel_readout_forwards_and_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel();
        let mut readout = ChannelReadout::new(tx);
        readout.value_changed(&ReadoutUpdate::new("Temperature", 12.0, "°C"));
        assert_eq!(rx.recv().map(|u| u.value).ok(), Some("12".to_string()));
        drop(rx);
        readout.value_changed(&ReadoutUpdate::new("Temperature", 13.0, "°C"));
    }
}
