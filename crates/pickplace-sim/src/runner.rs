//! Bevy-driven run loop.
//!
//! [`PickPlaceRunner`] owns a headless Bevy [`App`] whose resources are the
//! simulation host, the controller, the task and (in logging mode) the
//! recorder. One [`PickPlaceRunner::tick`] is one `App::update`, which runs
//! the [`PickPlacePlugin`] systems in order:
//!
//! 1. `step_host_system`: step the simulation, arm a reset when it stops.
//! 2. `control_system`: while playing, apply a pending reset, observe,
//!    advance the controller, capture and record, then apply the action
//!    unless the task is done.
//! 3. `termination_system`: end the run on test mode, host shutdown or the
//!    tick cap.

use bevy::prelude::*;
use tracing::{debug, info};

use pickplace_core::config::{LoggingConfig, PickPlaceConfig, RunConfig};
use pickplace_core::traits::{MotionGenerator, SimulationHost};
use pickplace_record::{FrameCapture, TaskLogger};
use pickplace_task::{Phase, PhaseTransition, PickPlaceController, PickPlaceTask};

use crate::error::RunError;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// The simulation being driven.
#[derive(Resource)]
pub struct Host(pub Box<dyn SimulationHost>);

#[derive(Resource)]
pub struct Controller(pub PickPlaceController);

#[derive(Resource)]
pub struct ActiveTask(pub PickPlaceTask);

/// Logger plus frame capture. Present only in [`RunMode::Logging`].
#[derive(Resource)]
pub struct Recording {
    pub logger: TaskLogger,
    pub capture: FrameCapture,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The cube was placed.
    Done,
    /// Test mode ends the run after its first tick.
    TestMode,
    /// The host application shut down.
    HostShutdown,
    /// `max_ticks` was reached.
    MaxTicks,
    /// A tick failed; the error is returned by [`PickPlaceRunner::tick`].
    Failed,
}

/// Per-run bookkeeping shared by the tick systems.
#[derive(Resource, Debug, Default)]
pub struct RunBook {
    /// Set when the host is seen stopped; consumed on the next playing tick.
    pub reset_pending: bool,
    /// Control ticks so far. Stamps log records and never rewinds on reset.
    pub tick: u64,
    /// Host steps so far, playing or not.
    pub host_ticks: u64,
    /// Resets applied after a stop/play cycle.
    pub resets: u32,
    pub stop_reason: Option<StopReason>,
    pub error: Option<RunError>,
}

impl RunBook {
    fn fail(&mut self, error: RunError) {
        self.error = Some(error);
        self.stop_reason = Some(StopReason::Failed);
    }
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

#[allow(clippy::needless_pass_by_value)]
fn step_host_system(mut host: ResMut<Host>, mut book: ResMut<RunBook>) {
    host.0.step();
    book.host_ticks += 1;
    if host.0.is_stopped() && !book.reset_pending {
        debug!(tick = book.host_ticks, "simulation stopped, reset pending");
        book.reset_pending = true;
    }
}

#[allow(clippy::needless_pass_by_value)]
fn control_system(
    mut host: ResMut<Host>,
    mut controller: ResMut<Controller>,
    task: Res<ActiveTask>,
    mut recording: Option<ResMut<Recording>>,
    logging: Res<LoggingConfig>,
    mut book: ResMut<RunBook>,
) {
    if book.stop_reason.is_some() || !host.0.is_playing() {
        return;
    }
    let result = control_tick(
        host.0.as_mut(),
        &mut controller.0,
        &task.0,
        recording.as_deref_mut(),
        &mut book,
    );
    match result {
        Ok(()) if logging.progress_interval.is_some_and(|every| book.tick % every == 0) => {
            info!(tick = book.tick, phase = %controller.0.phase(), "progress");
        }
        Ok(()) => {}
        Err(err) => book.fail(err),
    }
}

fn control_tick(
    host: &mut dyn SimulationHost,
    controller: &mut PickPlaceController,
    task: &PickPlaceTask,
    mut recording: Option<&mut Recording>,
    book: &mut RunBook,
) -> Result<(), RunError> {
    if book.reset_pending {
        info!(tick = book.tick, "simulation restarted, resetting task");
        host.reset();
        controller.reset();
        if let Some(recording) = recording.as_mut() {
            recording.capture.clear();
        }
        book.reset_pending = false;
        book.resets += 1;
    }

    let observation = task.observe(&host.observations())?;
    let action = controller.advance(
        &observation,
        task.target_position(),
        task.end_effector_offset(),
    )?;

    let tick = book.tick;
    book.tick += 1;
    if let Some(Recording { logger, capture }) = recording {
        capture.capture(tick, |camera| host.capture(camera))?;
        logger.record(
            tick,
            &observation.joints,
            &host.gripper_positions(),
            &observation.object,
            task.target_position(),
            &action,
            capture.latest(),
        )?;
    }

    if controller.is_done() {
        info!(tick, "Done picking and placing");
        book.stop_reason = Some(StopReason::Done);
    } else {
        host.apply_action(&action);
    }
    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn termination_system(host: Res<Host>, run: Res<RunConfig>, mut book: ResMut<RunBook>) {
    if book.stop_reason.is_some() {
        return;
    }
    let reason = if run.test_mode {
        Some(StopReason::TestMode)
    } else if !host.0.is_running() {
        Some(StopReason::HostShutdown)
    } else if run.max_ticks.is_some_and(|max| book.host_ticks >= max) {
        Some(StopReason::MaxTicks)
    } else {
        None
    };
    if let Some(reason) = reason {
        info!(?reason, host_ticks = book.host_ticks, "run ending");
        book.stop_reason = Some(reason);
    }
}

// ---------------------------------------------------------------------------
// PickPlacePlugin
// ---------------------------------------------------------------------------

/// Registers the tick systems. Expects the [`Host`], [`Controller`],
/// [`ActiveTask`], [`LoggingConfig`] and [`RunConfig`] resources to be
/// inserted by the caller.
pub struct PickPlacePlugin;

impl Plugin for PickPlacePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunBook>().add_systems(
            Update,
            (step_host_system, control_system, termination_system).chain(),
        );
    }
}

// ---------------------------------------------------------------------------
// PickPlaceRunner
// ---------------------------------------------------------------------------

/// Whether ticks are recorded and flushed to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Plain,
    Logging,
}

/// Outcome of one [`PickPlaceRunner::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    Stopped(StopReason),
}

/// What a finished run reports.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub ticks: u64,
    pub host_ticks: u64,
    pub resets: u32,
    pub phase: Phase,
    pub transitions: Vec<PhaseTransition>,
    /// Records written; zero outside logging mode.
    pub records: usize,
}

pub struct PickPlaceRunner {
    app: App,
    mode: RunMode,
}

impl PickPlaceRunner {
    /// Validate `config` and assemble the app. The controller is reset once
    /// here, so the first tick starts a fresh run.
    pub fn new(
        config: &PickPlaceConfig,
        host: Box<dyn SimulationHost>,
        motion: Box<dyn MotionGenerator>,
        mode: RunMode,
    ) -> Result<Self, RunError> {
        config.validate()?;

        info!(
            task = %config.task.name,
            host = host.name(),
            motion = motion.name(),
            ?mode,
            "starting pick-and-place run"
        );

        let mut controller = PickPlaceController::from_config(motion, config);
        controller.reset();

        let mut app = App::new();
        app.insert_resource(Host(host))
            .insert_resource(Controller(controller))
            .insert_resource(ActiveTask(PickPlaceTask::from_config(&config.task)))
            .insert_resource(config.logging.clone())
            .insert_resource(config.run.clone());

        if mode == RunMode::Logging {
            let capture = FrameCapture::from_config(&config.logging);
            capture.prepare()?;
            app.insert_resource(Recording {
                logger: TaskLogger::from_config(&config.logging),
                capture,
            });
        }

        app.add_plugins(PickPlacePlugin);
        app.finish();
        app.cleanup();

        Ok(Self { app, mode })
    }

    /// Run one tick. Once the run has ended, returns the stop reason without
    /// stepping again.
    pub fn tick(&mut self) -> Result<TickStatus, RunError> {
        if let Some(reason) = self.book().stop_reason {
            return Ok(TickStatus::Stopped(reason));
        }
        self.app.update();

        let mut book = self.app.world_mut().resource_mut::<RunBook>();
        if let Some(err) = book.error.take() {
            return Err(err);
        }
        Ok(book.stop_reason.map_or(TickStatus::Running, TickStatus::Stopped))
    }

    /// Tick until the run ends, then flush the log in logging mode.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        let stop_reason = loop {
            if let TickStatus::Stopped(reason) = self.tick()? {
                break reason;
            }
        };

        let world = self.app.world();
        if let Some(recording) = world.get_resource::<Recording>() {
            recording.logger.flush_to(world.resource::<LoggingConfig>())?;
        }

        let book = self.book();
        let controller = self.controller();
        Ok(RunSummary {
            stop_reason,
            ticks: book.tick,
            host_ticks: book.host_ticks,
            resets: book.resets,
            phase: controller.phase(),
            transitions: controller.transitions().to_vec(),
            records: self.logger().map_or(0, TaskLogger::len),
        })
    }

    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn book(&self) -> &RunBook {
        self.app.world().resource::<RunBook>()
    }

    pub fn host(&self) -> &dyn SimulationHost {
        self.app.world().resource::<Host>().0.as_ref()
    }

    pub fn controller(&self) -> &PickPlaceController {
        &self.app.world().resource::<Controller>().0
    }

    /// The run log, in logging mode.
    pub fn logger(&self) -> Option<&TaskLogger> {
        self.app
            .world()
            .get_resource::<Recording>()
            .map(|recording| &recording.logger)
    }

    pub const fn app(&self) -> &App {
        &self.app
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use pickplace_core::error::TaskError;
    use pickplace_core::observation::keys;
    use pickplace_ik::DlsMotionGenerator;
    use pickplace_record::{StructuredLog, TabularLog};
    use pickplace_test_utils::{GantryMotionGenerator, GantryWorld, GantryWorldConfig};

    use crate::world::KinematicWorld;

    fn gantry_runner(world: GantryWorldConfig, config: &PickPlaceConfig, mode: RunMode) -> PickPlaceRunner {
        PickPlaceRunner::new(
            config,
            Box::new(GantryWorld::new(world)),
            Box::new(GantryMotionGenerator::default()),
            mode,
        )
        .unwrap()
    }

    fn cube_position(runner: &PickPlaceRunner) -> Vector3<f32> {
        let obs = runner.host().observations();
        Vector3::from_column_slice(obs.get("cube", keys::POSITION).unwrap())
    }

    fn with_run(run: RunConfig) -> PickPlaceConfig {
        PickPlaceConfig {
            run,
            ..PickPlaceConfig::default()
        }
    }

    #[test]
    fn plugin_registers_run_book() {
        let runner = gantry_runner(
            GantryWorldConfig::default(),
            &PickPlaceConfig::default(),
            RunMode::Plain,
        );
        assert_eq!(runner.book().tick, 0);
        assert!(runner.controller().is_initialized());
        assert!(runner.logger().is_none());
        assert_eq!(runner.host().name(), "GantryWorld");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PickPlaceConfig::default();
        config.motion.physics_dt = 0.0;
        let result = PickPlaceRunner::new(
            &config,
            Box::new(GantryWorld::default()),
            Box::new(GantryMotionGenerator::default()),
            RunMode::Plain,
        );
        assert!(matches!(result, Err(RunError::Config(_))));
    }

    #[test]
    fn gantry_run_places_cube() {
        let config = with_run(RunConfig {
            max_ticks: Some(500),
            ..RunConfig::default()
        });
        let mut runner = gantry_runner(GantryWorldConfig::default(), &config, RunMode::Plain);
        let summary = runner.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::Done);
        assert_eq!(summary.phase, Phase::Done);
        assert_eq!(summary.resets, 0);
        assert_eq!(summary.records, 0);
        let phases: Vec<Phase> = summary.transitions.iter().map(|t| t.phase).collect();
        assert_eq!(phases, Phase::ALL);
        assert!((cube_position(&runner) - Vector3::new(0.8, 0.7, 1.0)).norm() < 0.02);
    }

    #[test]
    fn finished_run_does_not_step_again() {
        let config = with_run(RunConfig {
            max_ticks: Some(3),
            ..RunConfig::default()
        });
        let mut runner = gantry_runner(GantryWorldConfig::default(), &config, RunMode::Plain);
        let summary = runner.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::MaxTicks);
        assert_eq!(summary.host_ticks, 3);
        assert_eq!(runner.tick().unwrap(), TickStatus::Stopped(StopReason::MaxTicks));
        assert_eq!(runner.book().host_ticks, 3);
    }

    #[test]
    fn test_mode_exits_after_first_tick() {
        let config = with_run(RunConfig {
            test_mode: true,
            ..RunConfig::default()
        });
        let mut runner = gantry_runner(GantryWorldConfig::default(), &config, RunMode::Plain);
        let summary = runner.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::TestMode);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.phase, Phase::Approaching);
    }

    #[test]
    fn host_shutdown_ends_run() {
        let world = GantryWorldConfig {
            shutdown_at_tick: Some(4),
            ..GantryWorldConfig::default()
        };
        let mut runner = gantry_runner(world, &PickPlaceConfig::default(), RunMode::Plain);
        let summary = runner.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::HostShutdown);
        assert_eq!(summary.host_ticks, 4);
    }

    #[test]
    fn stop_and_resume_restarts_task() {
        let world = GantryWorldConfig {
            stop_at_tick: Some(50),
            resume_at_tick: Some(55),
            ..GantryWorldConfig::default()
        };
        let motion = GantryMotionGenerator::default();
        let motion_resets = motion.reset_counter();
        let mut runner = PickPlaceRunner::new(
            &PickPlaceConfig::default(),
            Box::new(GantryWorld::new(world)),
            Box::new(motion),
            RunMode::Plain,
        )
        .unwrap();
        assert_eq!(motion_resets.get(), 1);

        for _ in 0..49 {
            assert_eq!(runner.tick().unwrap(), TickStatus::Running);
        }
        assert_eq!(runner.controller().phase(), Phase::Transporting);

        // Stopped: no control ticks.
        for _ in 0..5 {
            runner.tick().unwrap();
        }
        assert!(runner.book().reset_pending);
        assert_eq!(runner.book().tick, 49);
        assert_eq!(runner.controller().phase(), Phase::Transporting);

        // Resumed: reset before the next advance.
        runner.tick().unwrap();
        assert!(!runner.book().reset_pending);
        assert_eq!(runner.book().resets, 1);
        assert_eq!(runner.book().tick, 50);
        assert_eq!(runner.controller().phase(), Phase::Approaching);
        assert_eq!(runner.controller().ticks(), 1);
        assert_eq!(motion_resets.get(), 2);
        assert!(runner.controller().picking_pose().is_some());

        let summary = runner.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Done);
        assert_eq!(summary.resets, 1);
    }

    #[test]
    fn missing_observation_fails_the_run() {
        let world = GantryWorldConfig {
            robot_name: "ur10".into(),
            ..GantryWorldConfig::default()
        };
        let mut runner = gantry_runner(world, &PickPlaceConfig::default(), RunMode::Plain);
        match runner.tick() {
            Err(RunError::Task(err)) => {
                assert_eq!(err, TaskError::invalid_observation("cs_66/joint_positions"));
            }
            other => panic!("expected task error, got {other:?}"),
        }
        assert_eq!(runner.tick().unwrap(), TickStatus::Stopped(StopReason::Failed));
    }

    #[test]
    fn record_budget_fails_logging_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PickPlaceConfig::default();
        config.logging.output_dir = dir.path().to_path_buf();
        config.logging.max_records = Some(3);
        let mut runner = gantry_runner(GantryWorldConfig::default(), &config, RunMode::Logging);

        let err = runner.run().unwrap_err();
        assert!(matches!(err, RunError::Record(_)), "{err}");
        assert_eq!(runner.logger().map(TaskLogger::len), Some(3));
        assert!(!config.logging.primary_path().exists());
    }

    #[test]
    fn logging_run_writes_json_csv_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = with_run(RunConfig {
            max_ticks: Some(500),
            ..RunConfig::default()
        });
        config.logging.output_dir = dir.path().to_path_buf();
        config.logging.progress_interval = Some(25);
        let mut runner = gantry_runner(GantryWorldConfig::default(), &config, RunMode::Logging);
        assert_eq!(runner.mode(), RunMode::Logging);

        let summary = runner.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Done);
        assert_eq!(summary.records as u64, summary.ticks);

        let dump = StructuredLog::read(config.logging.primary_path()).unwrap();
        assert_eq!(dump.len(), summary.records);
        assert_eq!(dump.time[0], 0);
        assert_eq!(dump.target_position[0], [0.8, 0.7, 1.0]);
        let camera1 = dump.image_paths_for("camera1").unwrap();
        assert!(camera1[0].as_deref().unwrap().ends_with("frame_0.json"));
        assert_eq!(camera1[9], camera1[0]);
        assert!(camera1[10].as_deref().unwrap().ends_with("frame_10.json"));

        let table = TabularLog::read(config.logging.secondary_path()).unwrap();
        assert_eq!(table.len(), summary.records);
        assert_eq!(table.rows(), runner.logger().unwrap().records());

        assert!(config.logging.camera_dir("camera2").join("frame_20.json").exists());
    }

    #[test]
    fn kinematic_world_with_ik_places_cube() {
        let config = with_run(RunConfig {
            max_ticks: Some(3000),
            ..RunConfig::default()
        });
        let mut runner = PickPlaceRunner::new(
            &config,
            Box::new(KinematicWorld::new(&config)),
            Box::new(DlsMotionGenerator::from_config(&config.robot, &config.motion)),
            RunMode::Plain,
        )
        .unwrap();
        let summary = runner.run().unwrap();

        assert_eq!(summary.stop_reason, StopReason::Done, "{summary:?}");
        assert_eq!(runner.controller().motion_generator().name(), "DlsMotionGenerator");
        let target = Vector3::from(config.task.target_position);
        assert!(
            (cube_position(&runner) - target).norm() < 0.03,
            "cube at {}",
            cube_position(&runner)
        );
    }
}
