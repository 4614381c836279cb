//! Stage sequencing of a full bake.
//!
//! A bake walks `Init -> Transmittance -> DirectIrradiance -> SingleScattering`,
//! then for every order `n` in `2..=max_order` runs
//! `ScatteringDensity(n) -> MultipleScattering(n) -> AccumulateIrradiance(n - 1)`
//! and ends in `Done`. Each stage reads only fully written outputs of earlier
//! stages; the per-order deltas are double buffered.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::info;

use crate::error::LayoutError;
use crate::executor::BakeExecutor;
use crate::irradiance::{generate_direct_irradiance_texture, generate_indirect_irradiance_texture};
use crate::model::{Atmosphere, SkyFixedConfigs};
use crate::multiple_scattering::generate_multiple_scattering_texture;
use crate::scattering::ScatteringDelta;
use crate::scattering_density::{ScatteringDensityInputs, generate_scattering_density_texture};
use crate::single_scattering::{SingleScattering, generate_single_scattering_texture};
use crate::texture::{Texture2D, Texture3D, TextureLayout};
use crate::transmittance::generate_transmittance_texture;

/// Highest scattering order computed unless configured otherwise.
pub const DEFAULT_MAX_SCATTERING_ORDER: u32 = 4;

/// Position of a bake in its stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BakeStage {
    /// Nothing computed yet.
    Init,
    Transmittance,
    /// Direct sun irradiance, the order-0 irradiance delta.
    DirectIrradiance,
    SingleScattering,
    /// Scattering density of `order`.
    ScatteringDensity { order: u32 },
    /// Multiple scattering of `order`, accumulated into the scattering table.
    MultipleScattering { order: u32 },
    /// Indirect irradiance of `order`, accumulated into the irradiance table.
    AccumulateIrradiance { order: u32 },
    Done,
}

impl BakeStage {
    /// The stage following `self` in a bake up to `max_order`.
    pub fn next(self, max_order: u32) -> BakeStage {
        match self {
            BakeStage::Init => BakeStage::Transmittance,
            BakeStage::Transmittance => BakeStage::DirectIrradiance,
            BakeStage::DirectIrradiance => BakeStage::SingleScattering,
            BakeStage::SingleScattering if max_order >= 2 => {
                BakeStage::ScatteringDensity { order: 2 }
            }
            BakeStage::SingleScattering => BakeStage::Done,
            BakeStage::ScatteringDensity { order } => BakeStage::MultipleScattering { order },
            BakeStage::MultipleScattering { order } => {
                BakeStage::AccumulateIrradiance { order: order - 1 }
            }
            BakeStage::AccumulateIrradiance { order } if order + 2 <= max_order => {
                BakeStage::ScatteringDensity { order: order + 2 }
            }
            BakeStage::AccumulateIrradiance { .. } | BakeStage::Done => BakeStage::Done,
        }
    }

    /// Every stage that does work in a bake up to `max_order`, in execution order.
    pub fn sequence(max_order: u32) -> Vec<BakeStage> {
        let mut stages = Vec::new();
        let mut stage = BakeStage::Init.next(max_order);
        while stage != BakeStage::Done {
            stages.push(stage);
            stage = stage.next(max_order);
        }
        stages
    }
}

impl fmt::Display for BakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BakeStage::Init => write!(f, "init"),
            BakeStage::Transmittance => write!(f, "transmittance"),
            BakeStage::DirectIrradiance => write!(f, "direct irradiance"),
            BakeStage::SingleScattering => write!(f, "single scattering"),
            BakeStage::ScatteringDensity { order } => write!(f, "scattering density #{order}"),
            BakeStage::MultipleScattering { order } => write!(f, "multiple scattering #{order}"),
            BakeStage::AccumulateIrradiance { order } => write!(f, "indirect irradiance #{order}"),
            BakeStage::Done => write!(f, "done"),
        }
    }
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: BakeStage,
    pub elapsed: Duration,
}

/// Everything a renderer needs from a finished bake.
#[derive(Debug, Clone)]
pub struct BakedTables {
    pub atmosphere: Atmosphere,
    pub fixed: SkyFixedConfigs,
    pub layout: TextureLayout,
    /// Transmittance to the top of the atmosphere, RGB.
    pub transmittance: Texture2D,
    /// Indirect ground irradiance summed over orders `1..max_order`, RGB.
    pub irradiance: Texture2D,
    /// Rayleigh-like scattering of every order in RGB, red single Mie in alpha.
    pub scattering: Texture3D,
    pub timings: Vec<StageTiming>,
}

impl BakedTables {
    /// Total time spent in all stages.
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|timing| timing.elapsed).sum()
    }
}

/// Drives the stages of a bake for one atmosphere and layout.
#[derive(Debug, Clone)]
pub struct BakeOrchestrator {
    atmosphere: Atmosphere,
    layout: TextureLayout,
    max_scattering_order: u32,
    executor: BakeExecutor,
}

impl BakeOrchestrator {
    /// Create an orchestrator with the default order and executor.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError`] if `layout` cannot be addressed by the parameterization.
    pub fn new(atmosphere: Atmosphere, layout: TextureLayout) -> Result<Self, LayoutError> {
        layout.validate()?;
        Ok(Self {
            atmosphere,
            layout,
            max_scattering_order: DEFAULT_MAX_SCATTERING_ORDER,
            executor: BakeExecutor::with_defaults(),
        })
    }

    /// Set the highest scattering order. Values below 1 are raised to 1.
    pub fn with_max_order(mut self, max_scattering_order: u32) -> Self {
        self.max_scattering_order = max_scattering_order.max(1);
        self
    }

    pub fn with_executor(mut self, executor: BakeExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn max_scattering_order(&self) -> u32 {
        self.max_scattering_order
    }

    pub fn layout(&self) -> &TextureLayout {
        &self.layout
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    /// Run every stage and return the finished tables.
    pub fn bake(&self) -> BakedTables {
        let atmosphere = &self.atmosphere;
        let layout = &self.layout;
        let executor = &self.executor;
        let mut clock = StageClock::new(self.max_scattering_order);

        info!(
            max_order = self.max_scattering_order,
            threads = executor.thread_count(),
            scattering_texels = u64::from(layout.scattering_width)
                * u64::from(layout.scattering_height)
                * u64::from(layout.scattering_depth),
            "starting atmosphere bake"
        );

        let transmittance = clock.run(BakeStage::Transmittance, || {
            generate_transmittance_texture(atmosphere, layout, executor)
        });

        // Direct irradiance only feeds the order-2 density pass.
        let mut delta_irradiance = clock.run(BakeStage::DirectIrradiance, || {
            generate_direct_irradiance_texture(atmosphere, layout, &transmittance, executor)
        });
        let mut irradiance = layout.irradiance_texture();

        let SingleScattering {
            delta_rayleigh,
            delta_mie,
            mut scattering,
        } = clock.run(BakeStage::SingleScattering, || {
            generate_single_scattering_texture(atmosphere, layout, &transmittance, executor)
        });
        let mut previous = ScatteringDelta::Single {
            rayleigh: delta_rayleigh,
            mie: delta_mie,
        };

        for order in 2..=self.max_scattering_order {
            let inputs = ScatteringDensityInputs {
                transmittance: &transmittance,
                scattering: previous.source(),
                irradiance: &delta_irradiance,
            };
            let density = clock.run(BakeStage::ScatteringDensity { order }, || {
                generate_scattering_density_texture(atmosphere, layout, &inputs, executor)
            });

            let delta_multiple = clock.run(BakeStage::MultipleScattering { order }, || {
                generate_multiple_scattering_texture(
                    atmosphere,
                    layout,
                    &transmittance,
                    &density,
                    &mut scattering,
                    executor,
                )
            });
            drop(density);

            let source = previous.source();
            delta_irradiance = clock.run(BakeStage::AccumulateIrradiance { order: order - 1 }, || {
                let delta = generate_indirect_irradiance_texture(atmosphere, layout, &source, executor);
                irradiance.add_assign(&delta);
                delta
            });

            previous = ScatteringDelta::Multiple(delta_multiple);
        }

        let timings = clock.finish();
        let tables = BakedTables {
            atmosphere: atmosphere.clone(),
            fixed: SkyFixedConfigs::from_atmosphere(atmosphere),
            layout: *layout,
            transmittance,
            irradiance,
            scattering,
            timings,
        };
        info!(
            elapsed_ms = tables.total_elapsed().as_secs_f64() * 1000.0,
            "atmosphere bake finished"
        );
        tables
    }
}

/// Times stages and checks they run in sequence.
struct StageClock {
    max_order: u32,
    current: BakeStage,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new(max_order: u32) -> Self {
        Self {
            max_order,
            current: BakeStage::Init,
            timings: Vec::new(),
        }
    }

    fn run<T>(&mut self, stage: BakeStage, work: impl FnOnce() -> T) -> T {
        debug_assert_eq!(self.current.next(self.max_order), stage, "stage out of sequence");
        let start = Instant::now();
        let output = work();
        let elapsed = start.elapsed();
        info!(
            stage = %stage,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "stage finished"
        );
        self.timings.push(StageTiming { stage, elapsed });
        self.current = stage;
        output
    }

    fn finish(self) -> Vec<StageTiming> {
        debug_assert_eq!(self.current.next(self.max_order), BakeStage::Done);
        self.timings
    }
}
