use glam::Vec3;

/// Default waypoints flown by the tour
pub const TOUR_WAYPOINTS: [Vec3; 5] = [
    Vec3::new(-220.463, 76.1223, 60.5421),
    Vec3::new(-188.463, 68.1223, 55.5421),
    Vec3::new(-135.346, 18.5052, 21.6539),
    Vec3::new(-79.5788, 26.3867, -9.06033),
    Vec3::new(177.952, 93.1747, -34.8625),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum TourStage {
    Travelling { elapsed: f32 },
    Paused { elapsed: f32 },
}

/// Scripted flight through a list of waypoints.
///
/// Each segment is flown by linear interpolation over `travel_time`, then
/// the camera holds at the reached waypoint for `pause_time`. The tour ends
/// once the last waypoint is reached.
#[derive(Debug, Clone)]
pub struct CameraTour {
    waypoints: Vec<Vec3>,
    travel_time: f32,
    pause_time: f32,
    segment: usize,
    stage: TourStage,
    running: bool,
}

impl Default for CameraTour {
    fn default() -> Self {
        Self::new(TOUR_WAYPOINTS.to_vec(), 3.0, 4.0)
    }
}

impl CameraTour {
    pub fn new(waypoints: Vec<Vec3>, travel_time: f32, pause_time: f32) -> Self {
        Self {
            waypoints,
            travel_time: travel_time.max(f32::EPSILON),
            pause_time: pause_time.max(0.0),
            segment: 0,
            stage: TourStage::Travelling { elapsed: 0.0 },
            running: false,
        }
    }

    /// Restart from the first waypoint. Tours with fewer than two
    /// waypoints never run.
    pub fn start(&mut self) {
        if self.waypoints.len() < 2 {
            log::warn!("[CameraTour::start] Need at least two waypoints, tour ignored");
            return;
        }
        self.segment = 0;
        self.stage = TourStage::Travelling { elapsed: 0.0 };
        self.running = true;
        log::info!("[CameraTour::start] Starting tour over {} waypoints", self.waypoints.len());
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the tour and return the camera position for this frame, or
    /// `None` when the tour is not running.
    pub fn update(&mut self, dt: f32) -> Option<Vec3> {
        if !self.running {
            return None;
        }

        let mut remaining = dt.max(0.0);
        loop {
            match self.stage {
                TourStage::Travelling { elapsed } => {
                    let elapsed = elapsed + remaining;
                    if elapsed < self.travel_time {
                        self.stage = TourStage::Travelling { elapsed };
                        let t = elapsed / self.travel_time;
                        let from = self.waypoints[self.segment];
                        let to = self.waypoints[self.segment + 1];
                        return Some(from.lerp(to, t));
                    }
                    remaining = elapsed - self.travel_time;
                    self.segment += 1;
                    if self.segment + 1 >= self.waypoints.len() {
                        self.running = false;
                        log::info!("[CameraTour::update] Tour finished");
                        return Some(self.waypoints[self.segment]);
                    }
                    self.stage = TourStage::Paused { elapsed: 0.0 };
                }
                TourStage::Paused { elapsed } => {
                    let elapsed = elapsed + remaining;
                    if elapsed < self.pause_time {
                        self.stage = TourStage::Paused { elapsed };
                        return Some(self.waypoints[self.segment]);
                    }
                    remaining = elapsed - self.pause_time;
                    self.stage = TourStage::Travelling { elapsed: 0.0 };
                }
            }
        }
    }
}
