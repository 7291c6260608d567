use sleep_core::{Actuator, DeployState};

/// Simulated deployable that takes `transit` seconds to change position.
#[derive(Clone, Debug)]
pub struct SimActuator {
    state: DeployState,
    mobile: bool,
    transit: f64,
    remaining: f64,
}

impl SimActuator {
    pub fn new(state: DeployState, transit: f64) -> Self {
        let mut actuator = Self {
            state,
            mobile: true,
            transit: transit.max(0.0),
            remaining: 0.0,
        };
        // Starting mid-motion runs a full transit.
        if matches!(state, DeployState::Retracting | DeployState::Extending) {
            actuator.remaining = actuator.transit;
            actuator.settle_if_done();
        }
        actuator
    }

    /// Returns `true` while a transit is still running.
    pub fn is_moving(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn set_mobile(&mut self, mobile: bool) {
        self.mobile = mobile;
    }

    pub fn break_down(&mut self) {
        self.state = DeployState::Broken;
        self.remaining = 0.0;
    }

    /// Returns `false` when the actuator was not broken.
    pub fn repair(&mut self) -> bool {
        if self.state != DeployState::Broken {
            return false;
        }
        self.state = DeployState::Retracted;
        true
    }

    /// Moves simulated time forward. Returns the state reached when a transit
    /// completes during this step.
    pub fn advance(&mut self, seconds: f64) -> Option<DeployState> {
        if self.remaining <= 0.0 {
            return None;
        }
        self.remaining -= seconds;
        self.settle_if_done()
    }

    fn begin(&mut self, moving: DeployState) {
        self.state = moving;
        self.remaining = self.transit;
        self.settle_if_done();
    }

    fn settle_if_done(&mut self) -> Option<DeployState> {
        if self.remaining > 0.0 {
            return None;
        }
        self.remaining = 0.0;
        self.state = match self.state {
            DeployState::Retracting => DeployState::Retracted,
            DeployState::Extending => DeployState::Extended,
            _ => return None,
        };
        Some(self.state)
    }
}

impl Actuator for SimActuator {
    fn deploy_state(&self) -> DeployState {
        self.state
    }

    fn can_move(&self) -> bool {
        self.mobile && self.state != DeployState::Broken
    }

    fn retract(&mut self) {
        if self.can_move() && matches!(self.state, DeployState::Extended | DeployState::Extending) {
            self.begin(DeployState::Retracting);
        }
    }

    fn extend(&mut self) {
        if self.can_move() && matches!(self.state, DeployState::Retracted | DeployState::Retracting)
        {
            self.begin(DeployState::Extending);
        }
    }
}
