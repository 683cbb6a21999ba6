use rand::rngs::StdRng;
use ts_events::EventService;

/// Mutable context passed to each manager pass during a tick.
pub struct TickContext<'a> {
    /// Tick number, starting at 1 for the first tick.
    pub tick: u64,
    /// Simulated seconds covered by this tick.
    pub dt: f32,
    /// The scene's event service.
    pub events: &'a mut EventService,
    /// The scene's seeded random number generator.
    pub rng: &'a mut StdRng,
}

impl TickContext<'_> {
    /// Queue an event for the scene's next drain.
    pub fn send<D: Send + 'static>(&mut self, data: D) {
        self.events.send(data);
    }
}

impl std::fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickContext")
            .field("tick", &self.tick)
            .field("dt", &self.dt)
            .finish_non_exhaustive()
    }
}
