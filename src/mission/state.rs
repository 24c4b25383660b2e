/// One planet in the fixed progression.
///
/// `position` is the signed distance to the rocket: negative while still
/// approaching, around zero once reached.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub index: usize,
    pub display_asset: String,
    pub position: f64,
    pub spawned: bool,
}

impl Target {
    pub fn new(index: usize, display_asset: &str, initial_distance: f64) -> Self {
        Target {
            index,
            display_asset: display_asset.to_string(),
            position: -initial_distance,
            spawned: false,
        }
    }

    /// Absolute distance, so a target coming from either side counts.
    pub fn is_within(&self, threshold: f64) -> bool {
        self.position.abs() < threshold
    }

    /// Move by `speed`, never past `hold_line` when one is given.
    ///
    /// A held target stops where it is rather than jumping back, so
    /// `position` never decreases.
    pub(crate) fn advance(&mut self, speed: f64, hold_line: Option<f64>) {
        let next = self.position + speed;
        self.position = match hold_line {
            Some(line) if speed > 0.0 => next.min(line).max(self.position),
            _ => next,
        };
    }
}

/// Game state of one mission run.
///
/// Only [`super::MissionEngine`] mutates it; the getters are for display and
/// tests.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionState {
    pub(crate) targets: Vec<Target>,
    pub(crate) current_target: usize,
    pub(crate) active: bool,
    pub(crate) capturing: bool,
    pub(crate) activated_count: usize,
    pub(crate) complete: bool,
}

impl MissionState {
    /// Every target parked at `-initial_distance`, nothing spawned, inactive.
    pub(crate) fn parked<'a>(assets: impl Fn(usize) -> &'a str, count: usize, distance: f64) -> Self {
        MissionState {
            targets: (0..count)
                .map(|index| Target::new(index, assets(index), distance))
                .collect(),
            current_target: 0,
            active: false,
            capturing: false,
            activated_count: 0,
            complete: false,
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn current_target(&self) -> usize {
        self.current_target
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn activated_count(&self) -> usize {
        self.activated_count
    }

    /// True once the last target has been captured in this run.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_line_stops_approach_without_moving_back() {
        let mut target = Target::new(1, "jupiter.svg", 12.0);
        target.advance(1.0, Some(-10.0));
        assert_eq!(target.position, -11.0);
        target.advance(1.0, Some(-10.0));
        assert_eq!(target.position, -10.0);
        target.advance(1.0, Some(-10.0));
        assert_eq!(target.position, -10.0);

        // already beyond the line: stays put, no rewind
        let mut past = Target::new(2, "saturn.svg", 0.0);
        past.position = 4.0;
        past.advance(1.0, Some(-10.0));
        assert_eq!(past.position, 4.0);
    }

    #[test]
    fn negative_speed_ignores_hold_line() {
        let mut target = Target::new(0, "mars.svg", 150.0);
        target.advance(-1.0, Some(-10.0));
        assert_eq!(target.position, -151.0);
    }

    #[test]
    fn proximity_uses_absolute_distance() {
        let mut target = Target::new(0, "mars.svg", 150.0);
        assert!(!target.is_within(10.0));
        target.position = -10.0;
        assert!(!target.is_within(10.0));
        target.position = -9.0;
        assert!(target.is_within(10.0));
        target.position = 9.5;
        assert!(target.is_within(10.0));
    }
}
