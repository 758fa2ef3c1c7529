//! The particle field: owns the motes, the pointer, and the surface they are
//! drawn on, and turns host events into state changes.
//!
//! A `Field` is driven from a single thread. Event handlers and [`Field::tick`]
//! never overlap, so a tick always sees a consistent pointer and particle set.

use glam::DVec2;

use crate::config::FieldConfig;
use crate::error::FieldError;
use crate::palette::Palette;
use crate::particle::Particle;
use crate::pointer::Pointer;
use crate::prng::Xorshift64;
use crate::surface::{Container, Extent, Surface};

/// What a click did to the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickReport {
    /// Particles that received a new velocity.
    pub kicked: usize,
    /// Particles sitting exactly on the click point, left untouched.
    pub skipped: usize,
}

/// An animated field of motes bound to one container and one surface.
pub struct Field<C, S> {
    container: C,
    surface: S,
    config: FieldConfig,
    palette: Palette,
    rng: Xorshift64,
    particles: Vec<Particle>,
    pointer: Pointer,
    extent: Extent,
    frames: u64,
}

impl<C: Container, S: Surface> Field<C, S> {
    /// Measures the container, sizes the surface to match, and creates
    /// `config.particle_count` particles.
    ///
    /// Returns `FieldError::MissingElement` when either element is absent,
    /// and config errors from [`FieldConfig::validate`]. Hosts treat both as
    /// "do not start". A zero-size container is not an error.
    pub fn initialize(
        container: Option<C>,
        surface: Option<S>,
        config: FieldConfig,
        seed: u64,
    ) -> Result<Self, FieldError> {
        let container =
            container.ok_or_else(|| FieldError::MissingElement("container".to_string()))?;
        let surface = surface.ok_or_else(|| FieldError::MissingElement("surface".to_string()))?;
        config.validate()?;
        let palette = config.palette()?;

        let mut field = Self {
            container,
            surface,
            pointer: Pointer::new(config.interaction_radius),
            palette,
            rng: Xorshift64::new(seed),
            particles: Vec::with_capacity(config.particle_count),
            extent: Extent::default(),
            frames: 0,
            config,
        };
        field.relayout();
        log::debug!(
            "field initialized: {} particles over {}x{}",
            field.particles.len(),
            field.extent.width(),
            field.extent.height()
        );
        Ok(field)
    }

    /// Re-measures the container, resizes the surface, and recreates every
    /// particle at a fresh rest position.
    pub fn handle_resize(&mut self) {
        self.relayout();
        log::debug!(
            "field resized to {}x{}",
            self.extent.width(),
            self.extent.height()
        );
    }

    fn relayout(&mut self) {
        let (width, height) = self.container.measure();
        let (extent, problem) = Extent::measured(width, height);
        if let Some(problem) = problem {
            log::warn!("{problem}; continuing with an empty field");
        }
        self.extent = extent;
        self.surface.resize(extent.width(), extent.height());

        let count = self.config.particle_count;
        let accent = self.config.accent_shape_chance;
        self.particles.clear();
        for _ in 0..count {
            let particle = Particle::create(&mut self.rng, extent, &self.palette, accent);
            self.particles.push(particle);
        }
    }

    /// Container-local coordinates, taken as-is.
    pub fn handle_pointer_move(&mut self, x: f64, y: f64) {
        self.pointer.move_to(x, y);
    }

    /// Disables repulsion and tethers until the next move.
    pub fn handle_pointer_leave(&mut self) {
        self.pointer.leave();
    }

    /// Kicks every particle within the falloff radius of `(x, y)` outward.
    pub fn handle_click(&mut self, x: f64, y: f64) -> ClickReport {
        let origin = DVec2::new(x, y);
        let falloff = self.config.falloff_radius;
        let dynamics = self.config.dynamics;
        let mut report = ClickReport::default();
        for particle in &mut self.particles {
            match particle.apply_impulse(origin, falloff, &dynamics) {
                Ok(true) => report.kicked += 1,
                Ok(false) => {}
                Err(e) => {
                    log::trace!("skipping impulse: {e}");
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// One frame: clear the whole surface, then advance and draw every
    /// particle in order.
    pub fn tick(&mut self) {
        self.surface
            .clear_rect(0.0, 0.0, self.extent.width(), self.extent.height());
        let dynamics = self.config.dynamics;
        for particle in &mut self.particles {
            particle.advance(&self.pointer, &dynamics);
            particle.draw(&mut self.surface, &self.pointer);
        }
        self.frames += 1;
    }

    /// Ends the field's life and hands the host back its elements.
    pub fn teardown(self) -> (C, S) {
        log::debug!("field torn down after {} frames", self.frames);
        (self.container, self.surface)
    }
}

impl<C, S> Field<C, S> {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    /// Ticks run since initialize.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    /// For hosts whose container size is set directly. Follow with
    /// [`handle_resize`](Field::handle_resize).
    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, FixedContainer, RecordingSurface};
    use serde_json::json;

    type TestField = Field<FixedContainer, RecordingSurface>;

    fn field_with(width: f64, height: f64, params: serde_json::Value) -> TestField {
        Field::initialize(
            Some(FixedContainer::new(width, height)),
            Some(RecordingSurface::new()),
            FieldConfig::from_json(&params),
            42,
        )
        .unwrap()
    }

    fn field(width: f64, height: f64) -> TestField {
        field_with(width, height, json!({}))
    }

    fn assert_layout(f: &TestField, n: usize, width: f64, height: f64) {
        assert_eq!(f.particles().len(), n);
        for p in f.particles() {
            let b = p.base_position();
            assert!((0.0..=width).contains(&b.x), "x {} outside {width}", b.x);
            assert!((0.0..=height).contains(&b.y), "y {} outside {height}", b.y);
        }
    }

    // ---- initialize ----

    #[test]
    fn initialize_populates_default_count_and_sizes_surface() {
        let f = field(1280.0, 480.0);
        assert_layout(&f, 550, 1280.0, 480.0);
        assert_eq!(f.extent(), Extent::new(1280.0, 480.0));
        assert_eq!(f.surface().width(), 1280.0);
        assert_eq!(f.surface().height(), 480.0);
        assert!(!f.pointer().is_present());
        assert_eq!(f.pointer().radius(), 200.0);
        assert_eq!(f.frame_count(), 0);
    }

    #[test]
    fn initialize_without_container_declines() {
        let result: Result<TestField, _> = Field::initialize(
            None,
            Some(RecordingSurface::new()),
            FieldConfig::default(),
            1,
        );
        assert!(matches!(result, Err(FieldError::MissingElement(ref e)) if e == "container"));
    }

    #[test]
    fn initialize_without_surface_declines() {
        let result: Result<TestField, _> = Field::initialize(
            Some(FixedContainer::new(10.0, 10.0)),
            None,
            FieldConfig::default(),
            1,
        );
        assert!(matches!(result, Err(FieldError::MissingElement(ref e)) if e == "surface"));
    }

    #[test]
    fn initialize_rejects_invalid_config() {
        let result: Result<TestField, _> = Field::initialize(
            Some(FixedContainer::new(10.0, 10.0)),
            Some(RecordingSurface::new()),
            FieldConfig::from_json(&json!({"palette": "plaid"})),
            1,
        );
        assert!(matches!(result, Err(FieldError::InvalidPalette(_))));
    }

    #[test]
    fn initialize_declines_oversized_particle_count() {
        let result: Result<TestField, _> = Field::initialize(
            Some(FixedContainer::new(10.0, 10.0)),
            Some(RecordingSurface::new()),
            FieldConfig::from_json(&json!({"particle_count": 1_000_000_000_000_000_000u64})),
            1,
        );
        assert!(matches!(result, Err(FieldError::InvalidConfig(_))));
    }

    #[test]
    fn zero_size_container_gives_degenerate_but_working_field() {
        let mut f = field(0.0, 0.0);
        assert_eq!(f.particles().len(), 550);
        assert!(f.extent().is_degenerate());
        f.handle_pointer_move(0.0, 0.0);
        f.handle_click(0.0, 0.0);
        for _ in 0..5 {
            f.tick();
        }
        assert!(f.particles().iter().all(|p| p.position().is_finite()));
    }

    #[test]
    fn negative_container_size_is_treated_as_empty() {
        let f = field(-100.0, 50.0);
        assert_eq!(f.extent().width(), 0.0);
        assert_layout(&f, 550, 0.0, 50.0);
    }

    #[test]
    fn same_seed_same_field() {
        let a = field(640.0, 480.0);
        let b = field(640.0, 480.0);
        assert_eq!(a.particles(), b.particles());
    }

    // ---- resize ----

    #[test]
    fn resize_recreates_all_particles_inside_new_extent() {
        let mut f = field(1280.0, 480.0);
        let before = f.particles().to_vec();
        f.container_mut().width = 320.0;
        f.container_mut().height = 200.0;
        f.handle_resize();
        assert_layout(&f, 550, 320.0, 200.0);
        assert_eq!(f.surface().width(), 320.0);
        assert_ne!(f.particles(), &before[..]);
        assert!(f.particles().iter().all(|p| p.velocity() == DVec2::ZERO));
    }

    #[test]
    fn resize_to_same_size_still_rerolls() {
        let mut f = field(500.0, 500.0);
        let before = f.particles().to_vec();
        f.handle_resize();
        assert_ne!(f.particles(), &before[..]);
    }

    #[test]
    fn resize_discards_impulses() {
        let mut f = field(400.0, 400.0);
        f.handle_click(200.0, 200.0);
        f.handle_resize();
        assert!(f.particles().iter().all(|p| p.velocity() == DVec2::ZERO));
    }

    // ---- pointer ----

    #[test]
    fn pointer_move_and_leave() {
        let mut f = field(100.0, 100.0);
        f.handle_pointer_move(12.0, 34.0);
        assert_eq!(f.pointer().position(), Some(DVec2::new(12.0, 34.0)));
        f.handle_pointer_move(-50.0, 9000.0);
        assert_eq!(f.pointer().position(), Some(DVec2::new(-50.0, 9000.0)));
        f.handle_pointer_leave();
        assert!(!f.pointer().is_present());
    }

    #[test]
    fn pointer_displaces_without_setting_velocity() {
        let mut f = field_with(400.0, 400.0, json!({"particle_count": 1}));
        f.particles[0] = f.particles[0].clone().with_rest(200.0, 200.0);
        f.handle_pointer_move(150.0, 200.0);
        f.tick();
        let p = &f.particles()[0];
        assert!(p.position().x > 200.0);
        assert_eq!(p.velocity(), DVec2::ZERO);
    }

    #[test]
    fn after_leave_particles_relax_home() {
        let mut f = field_with(400.0, 400.0, json!({"particle_count": 1}));
        f.particles[0] = f.particles[0].clone().with_rest(200.0, 200.0);
        f.handle_pointer_move(190.0, 200.0);
        for _ in 0..50 {
            f.tick();
        }
        assert!(f.particles()[0].position().x > 201.0);
        f.handle_pointer_leave();
        for _ in 0..800 {
            f.tick();
        }
        let gap = (f.particles()[0].position() - DVec2::new(200.0, 200.0)).length();
        assert!(gap < 1e-6, "gap {gap}");
    }

    // ---- click ----

    #[test]
    fn click_scenario_from_the_hero_banner() {
        let mut f = field_with(
            1280.0,
            480.0,
            json!({"particle_count": 550, "interaction_radius": 200, "falloff_radius": 400}),
        );
        f.particles[0] = f.particles[0].clone().with_rest(100.0, 100.0);
        f.particles[1] = f.particles[1].clone().with_rest(150.0, 100.0);

        let report = f.handle_click(100.0, 100.0);

        assert!(report.skipped >= 1);
        assert_eq!(f.particles()[0].velocity(), DVec2::ZERO);
        let v = f.particles()[1].velocity();
        assert!((v.length() - 43.75).abs() < 1e-9);
        assert!((v.normalize() - DVec2::X).length() < 1e-12, "toward (200, 100)");
    }

    #[test]
    fn click_only_reaches_particles_inside_falloff() {
        let mut f = field_with(2000.0, 2000.0, json!({"particle_count": 300}));
        let origin = DVec2::new(1000.0, 1000.0);
        let before = f.particles().to_vec();
        let report = f.handle_click(origin.x, origin.y);
        let mut inside = 0;
        for (old, new) in before.iter().zip(f.particles()) {
            let d = (old.position() - origin).length();
            if d < 400.0 {
                inside += 1;
                assert!((new.velocity().length() - (400.0 - d) / 8.0).abs() < 1e-9);
            } else {
                assert_eq!(new.velocity(), old.velocity());
            }
        }
        assert_eq!(report.kicked, inside);
        assert!(inside > 0);
    }

    #[test]
    fn click_velocity_decays_every_tick() {
        let mut f = field_with(800.0, 800.0, json!({"particle_count": 40}));
        f.handle_click(400.0, 400.0);
        let mut speeds: Vec<f64> = f.particles().iter().map(|p| p.velocity().length()).collect();
        for _ in 0..60 {
            f.tick();
            for (p, last) in f.particles().iter().zip(speeds.iter_mut()) {
                let speed = p.velocity().length();
                if *last > 0.0 {
                    assert!(speed < *last);
                }
                *last = speed;
            }
        }
    }

    // ---- tick ----

    #[test]
    fn tick_clears_then_draws_each_particle_in_order() {
        let mut f = field_with(300.0, 200.0, json!({"particle_count": 3}));
        f.surface_mut().take_commands();
        f.tick();
        let cmds = f.surface().commands();
        assert_eq!(
            cmds[0],
            DrawCommand::ClearRect {
                x: 0.0,
                y: 0.0,
                width: 300.0,
                height: 200.0
            }
        );
        let translations: Vec<_> = cmds
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Translate { x, y } => Some(DVec2::new(*x, *y)),
                _ => None,
            })
            .collect();
        let positions: Vec<_> = f.particles().iter().map(|p| p.position()).collect();
        assert_eq!(translations, positions);
        assert_eq!(f.frame_count(), 1);
    }

    #[test]
    fn saves_and_restores_balance_each_frame() {
        let mut f = field(640.0, 360.0);
        f.handle_pointer_move(320.0, 180.0);
        f.surface_mut().take_commands();
        f.tick();
        let saves = f
            .surface()
            .commands()
            .iter()
            .filter(|c| **c == DrawCommand::Save)
            .count();
        let restores = f
            .surface()
            .commands()
            .iter()
            .filter(|c| **c == DrawCommand::Restore)
            .count();
        assert_eq!(saves, 550);
        assert_eq!(saves, restores);
    }

    #[test]
    fn tethers_only_drawn_while_pointer_present() {
        let count_tethers = |f: &TestField| {
            f.surface()
                .commands()
                .iter()
                .filter(|c| matches!(c, DrawCommand::SetLineWidth { width } if *width == 0.8))
                .count()
        };
        let mut f = field(400.0, 400.0);
        f.handle_pointer_move(200.0, 200.0);
        f.surface_mut().take_commands();
        f.tick();
        assert!(count_tethers(&f) > 0);

        f.handle_pointer_leave();
        f.surface_mut().take_commands();
        f.tick();
        assert_eq!(count_tethers(&f), 0);
    }

    #[test]
    fn opacity_band_holds_across_many_frames() {
        let mut f = field_with(300.0, 300.0, json!({"particle_count": 100}));
        for _ in 0..500 {
            f.tick();
            f.surface_mut().take_commands();
            assert!(f
                .particles()
                .iter()
                .all(|p| (0.2..=0.9).contains(&p.opacity())));
        }
    }

    #[test]
    fn teardown_returns_elements() {
        let mut f = field(64.0, 48.0);
        f.tick();
        let (container, surface) = f.teardown();
        assert_eq!(container.measure(), (64.0, 48.0));
        assert!(!surface.commands().is_empty());
    }

    #[test]
    fn two_fields_are_independent() {
        let mut a = field(200.0, 200.0);
        let b = field(200.0, 200.0);
        a.handle_pointer_move(100.0, 100.0);
        a.handle_click(100.0, 100.0);
        a.tick();
        assert!(!b.pointer().is_present());
        assert!(b.particles().iter().all(|p| p.velocity() == DVec2::ZERO));
        assert_eq!(b.frame_count(), 0);
    }
}
