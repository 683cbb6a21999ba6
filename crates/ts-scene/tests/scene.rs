use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use glam::Vec2;
use ts_core::{
    Behaviour, BehaviourManager, CoreError, CoreResult, PassControl, Property, PropertyContext,
    TickContext, Timestep, Update,
};
use ts_events::EventError;
use ts_physics::integrator::{ACCELERATION, POSITION, VELOCITY};
use ts_physics::{
    Damping, Euler2D, EulerManager, InverseMass, Vec2Arithmetic, Verlet2D, VerletManager,
};
use ts_scene::{Scene, SceneConfig, SceneError};

const DT: f32 = 0.05;

/// Adds `g * dt` to the acceleration accumulator every tick.
#[derive(Debug)]
struct Gravity {
    g: Vec2,
    acceleration: Option<Property<Vec2>>,
}

impl Gravity {
    fn earth() -> Self {
        Self {
            g: Vec2::new(0.0, -9.8),
            acceleration: None,
        }
    }
}

impl Behaviour for Gravity {
    type Manager = BehaviourManager<Self>;

    fn declare(&mut self, ctx: &mut PropertyContext<'_>) -> CoreResult<()> {
        self.acceleration = Some(ctx.declare_property(ACCELERATION, Vec2::ZERO)?);
        Ok(())
    }
}

impl Update for Gravity {
    fn update(&mut self, ctx: &mut TickContext<'_>, _: &mut PassControl) -> CoreResult<()> {
        let step = self.g * ctx.dt;
        if let Some(acceleration) = &self.acceleration {
            acceleration.update(|a| *a += step);
        }
        Ok(())
    }
}

fn vec2(scene: &Scene, id: ts_core::EntityId, name: &str) -> Vec2 {
    scene
        .entity(id)
        .unwrap()
        .property::<Vec2>(name)
        .unwrap()
        .get()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JobDone(usize);

#[test]
fn sends_from_many_threads_are_delivered_exactly_once() {
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let seen = Rc::new(RefCell::new(vec![0_u32; 4 * 500]));
    let sink = Rc::clone(&seen);
    scene
        .events_mut()
        .get_event::<JobDone>()
        .add_listener(move |job| sink.borrow_mut()[job.0] += 1);

    let sent = Arc::new(AtomicUsize::new(0));
    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let sender = scene.event_sender::<JobDone>();
            let sent = Arc::clone(&sent);
            thread::spawn(move || {
                for i in 0..500 {
                    sender.send(JobDone(worker * 500 + i));
                    sent.fetch_add(1, Ordering::Relaxed);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let report = scene.tick().unwrap();
    assert_eq!(sent.load(Ordering::Relaxed), 2000);
    assert_eq!(report.delivered, 2000);
    assert!(seen.borrow().iter().all(|&n| n == 1));
    assert_eq!(scene.events().pending(), 0);
}

#[test]
fn verlet_tracks_euler_for_a_thrown_ball() {
    let config = SceneConfig::default().with_fixed_dt(DT);
    let mut scene = Scene::new(config).unwrap();
    let verlet = VerletManager::<Vec2Arithmetic>::new(&scene.config().timestep).unwrap();

    scene.add_manager(BehaviourManager::<Gravity>::new()).unwrap();
    scene.bind_manager(EulerManager::<Vec2Arithmetic>::new()).unwrap();
    scene.bind_manager(verlet).unwrap();
    scene.schedule::<EulerManager<Vec2Arithmetic>>("velocity").unwrap();
    scene.schedule::<VerletManager<Vec2Arithmetic>>("velocity").unwrap();
    scene.schedule::<EulerManager<Vec2Arithmetic>>("position").unwrap();
    scene.schedule::<VerletManager<Vec2Arithmetic>>("position").unwrap();

    let throw = Vec2::new(3.0, 8.0);
    let euler = scene
        .spawn("euler ball", |e| {
            e.property(VELOCITY, throw)?;
            e.attach(Gravity::earth())?;
            e.attach(Euler2D::default())?;
            Ok(())
        })
        .unwrap();
    let verlet = scene
        .spawn("verlet ball", |e| {
            e.property(VELOCITY, throw)?;
            e.attach(Gravity::earth())?;
            e.attach(Verlet2D::default())?;
            Ok(())
        })
        .unwrap();

    for _ in 0..40 {
        scene.tick().unwrap();
        let (pe, pv) = (vec2(&scene, euler, POSITION), vec2(&scene, verlet, POSITION));
        assert!(pe.abs_diff_eq(pv, 1e-3), "{pe} vs {pv}");
    }

    // Two seconds of flight: the ball has come back down.
    let landed = vec2(&scene, euler, POSITION);
    assert!(landed.y < 0.0);
    assert!((landed.x - 6.0).abs() < 1e-3);
}

#[test]
fn verlet_manager_rejects_variable_timestep_scenes() {
    let mut scene = Scene::new(
        SceneConfig::default().with_timestep(Timestep::Variable { max_dt: 0.1 }),
    )
    .unwrap();
    let err = VerletManager::<Vec2Arithmetic>::new(&scene.config().timestep).unwrap_err();
    assert!(matches!(err, CoreError::PreconditionViolation(_)));

    // A manager built for another scene's fixed step is refused at bind time.
    let borrowed = VerletManager::<Vec2Arithmetic>::new(&Timestep::Fixed { dt: 0.1 }).unwrap();
    assert!(matches!(
        scene.add_manager(borrowed),
        Err(SceneError::Core(CoreError::PreconditionViolation(_)))
    ));
    assert!(scene.manager::<VerletManager<Vec2Arithmetic>>().is_none());
    assert!(scene.managers().schedule_names().is_empty());

    scene.tick().unwrap();
    scene.advance(0.5).unwrap();
}

#[test]
fn verlet_manager_must_match_the_scene_step() {
    let mut scene = Scene::new(SceneConfig::default().with_fixed_dt(DT)).unwrap();
    let coarse = VerletManager::<Vec2Arithmetic>::new(&Timestep::Fixed { dt: DT * 2.0 }).unwrap();
    assert!(matches!(
        scene.bind_manager(coarse),
        Err(SceneError::Core(CoreError::PreconditionViolation(_)))
    ));
    assert!(scene.manager::<VerletManager<Vec2Arithmetic>>().is_none());

    let matching = VerletManager::<Vec2Arithmetic>::new(&scene.config().timestep).unwrap();
    scene.add_manager(matching).unwrap();
    assert!(scene.manager::<VerletManager<Vec2Arithmetic>>().is_some());
}

#[test]
fn damping_slows_a_sliding_body() {
    let mut scene = Scene::new(SceneConfig::default().with_fixed_dt(DT)).unwrap();
    scene
        .add_manager(BehaviourManager::<Damping<Vec2Arithmetic>>::new())
        .unwrap();
    scene
        .add_manager(BehaviourManager::<InverseMass<Vec2Arithmetic>>::new())
        .unwrap();
    scene
        .add_manager(EulerManager::<Vec2Arithmetic>::new())
        .unwrap();

    let id = scene
        .spawn("puck", |e| {
            e.property(VELOCITY, Vec2::new(10.0, 0.0))?;
            e.attach(InverseMass::with_mass(Vec2Arithmetic, 2.0)?)?;
            e.attach(Damping::new(Vec2Arithmetic, 4.0))?;
            e.attach(Euler2D::default())?;
            Ok(())
        })
        .unwrap();

    let mut last = 10.0;
    for _ in 0..20 {
        scene.tick().unwrap();
        let speed = vec2(&scene, id, VELOCITY).x;
        assert!(speed < last && speed > 0.0, "{speed} after {last}");
        last = speed;
    }
    // v' = v * (1 - c * dt / m) each tick.
    let expected = 10.0 * (1.0_f32 - 4.0 * DT / 2.0).powi(20);
    assert!((last - expected).abs() < 1e-3, "{last} vs {expected}");
}

#[test]
fn damping_without_inverse_mass_fails_to_spawn() {
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    scene
        .add_manager(BehaviourManager::<Damping<Vec2Arithmetic>>::new())
        .unwrap();
    let err = scene
        .spawn("drifter", |e| {
            e.attach(Damping::new(Vec2Arithmetic, 1.0))?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(
        err,
        SceneError::Core(CoreError::PreconditionViolation(_))
    ));
    assert_eq!(scene.entity_count(), 0);
    assert_eq!(scene.managers().behaviour_count(), 0);
}

#[test]
fn schedule_interleaves_integrator_passes() {
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    scene.bind_manager(EulerManager::<Vec2Arithmetic>::new()).unwrap();
    scene.bind_manager(BehaviourManager::<Gravity>::new()).unwrap();
    scene.schedule::<EulerManager<Vec2Arithmetic>>("velocity").unwrap();
    scene.schedule::<BehaviourManager<Gravity>>("update").unwrap();
    scene.schedule::<EulerManager<Vec2Arithmetic>>("position").unwrap();

    let passes: Vec<_> = scene
        .managers()
        .schedule_names()
        .into_iter()
        .map(|(_, pass)| pass)
        .collect();
    insta::assert_debug_snapshot!(passes, @r#"
    [
        "velocity",
        "update",
        "position",
    ]
    "#);

    assert!(matches!(
        scene.schedule::<EulerManager<Vec2Arithmetic>>("constraints"),
        Err(SceneError::Core(CoreError::NotFound(_)))
    ));
}

#[derive(Debug)]
struct Alarm(u32);

#[test]
fn a_failing_listener_aborts_the_tick_and_the_rest_arrive_next_tick() {
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let heard = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&heard);
    scene
        .events_mut()
        .get_event::<Alarm>()
        .add_fallible_listener(move |alarm: &Alarm| {
            if alarm.0 == 2 && !sink.borrow().contains(&-2) {
                sink.borrow_mut().push(-2);
                return Err("alarm 2 rejected");
            }
            sink.borrow_mut().push(alarm.0 as i32);
            Ok(())
        });

    for n in 1..=3 {
        scene.events_mut().send(Alarm(n));
    }
    let err = scene.tick().unwrap_err();
    assert!(matches!(
        err,
        SceneError::Event(EventError::ListenerFailed { .. })
    ));
    assert_eq!(*heard.borrow(), vec![1, -2]);

    scene.tick().unwrap();
    assert_eq!(*heard.borrow(), vec![1, -2, 3]);
}

#[test]
fn runaway_event_loop_is_reported_when_capped() {
    #[derive(Debug)]
    struct Echo;

    let mut scene = Scene::new(SceneConfig::default().with_max_drain_flips(8)).unwrap();
    let echo = scene.event_sender::<Echo>();
    scene
        .events_mut()
        .get_event::<Echo>()
        .add_listener(move |_| echo.send(Echo));
    scene.events_mut().send(Echo);

    let err = scene.tick().unwrap_err();
    assert!(matches!(
        err,
        SceneError::Event(EventError::DrainOverflow { flips: 8, .. })
    ));
}
