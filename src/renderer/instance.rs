//! GPU-ready instance data
//!
//! Flat `#[repr(C)]` records a renderer can upload with
//! `bytemuck::cast_slice` without touching the simulation types.

use bytemuck::{Pod, Zeroable};

use super::FrameSnapshot;

/// Maximum instances uploaded per frame
pub const MAX_INSTANCES: usize = 512;
/// Maximum laser trail points uploaded per frame
pub const MAX_TRAIL: usize = 256;

/// Instance kind tags (must match shader)
pub mod kind {
    pub const BALL: u32 = 0;
    pub const BEAN: u32 = 1;
    pub const COFFEE: u32 = 2;
    pub const MAGNET: u32 = 3;
    pub const OBSTACLE: u32 = 4;
    pub const LASER_HEAD: u32 = 5;
    pub const OIL: u32 = 6;
}

/// Per-frame uniforms
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub resolution: [f32; 2], // offset 0
    pub health: f32,          // offset 8, 0-1
    pub instance_count: u32,  // offset 12
    pub trail_count: u32,     // offset 16
    pub rush_active: u32,     // offset 20
    pub magnet_active: u32,   // offset 24
    pub in_oil: u32,          // offset 28
}

/// One drawable circle-like entity
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Instance {
    pub position: [f32; 2],
    pub radius: f32,
    pub kind: u32,
}

impl Instance {
    pub const fn new(x: f32, y: f32, radius: f32, kind: u32) -> Self {
        Self {
            position: [x, y],
            radius,
            kind,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TrailPoint {
    pub position: [f32; 2],
    /// 0 (oldest) to 1 (newest)
    pub alpha: f32,
    pub width: f32,
}

/// Buffers for one frame, ready to upload
#[derive(Debug, Clone, Default)]
pub struct FrameInstances {
    pub uniform: FrameUniform,
    pub instances: Vec<Instance>,
    pub trail: Vec<TrailPoint>,
}

impl FrameInstances {
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    pub fn trail_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.trail)
    }
}

/// Pack a snapshot. Oil first so everything else draws on top; the ball last.
pub fn pack(frame: &FrameSnapshot) -> FrameInstances {
    let mut instances = Vec::with_capacity(MAX_INSTANCES.min(
        frame.oil_spills.len() + frame.obstacles.len() + frame.collectibles.len() + frame.lasers.len() + 1,
    ));

    instances.extend(
        frame
            .oil_spills
            .iter()
            .map(|o| Instance::new(o.pos.x, o.pos.y, o.radius, kind::OIL)),
    );
    instances.extend(
        frame
            .obstacles
            .iter()
            .map(|o| Instance::new(o.pos.x, o.pos.y, o.radius, kind::OBSTACLE)),
    );
    instances.extend(frame.collectibles.iter().map(|c| {
        let tag = match c.kind {
            crate::sim::CollectibleKind::Regular => kind::BEAN,
            crate::sim::CollectibleKind::Coffee => kind::COFFEE,
            crate::sim::CollectibleKind::Magnet => kind::MAGNET,
        };
        Instance::new(c.pos.x, c.pos.y, c.radius, tag)
    }));
    instances.extend(
        frame
            .lasers
            .iter()
            .filter(|l| l.active)
            .map(|l| Instance::new(l.head.x, l.head.y, l.width, kind::LASER_HEAD)),
    );
    // Keep room for the ball
    instances.truncate(MAX_INSTANCES - 1);
    instances.push(Instance::new(
        frame.ball.pos.x,
        frame.ball.pos.y,
        frame.ball.radius,
        kind::BALL,
    ));

    let mut trail = Vec::new();
    'lasers: for laser in frame.lasers.iter().filter(|l| l.active) {
        let n = laser.trail.len().max(1) as f32;
        for (i, p) in laser.trail.iter().enumerate() {
            if trail.len() >= MAX_TRAIL {
                break 'lasers;
            }
            trail.push(TrailPoint {
                position: [p.x, p.y],
                alpha: (i + 1) as f32 / n,
                width: laser.width,
            });
        }
    }

    let hud = &frame.hud;
    FrameInstances {
        uniform: FrameUniform {
            resolution: [frame.width, frame.height],
            health: hud.health_percent / 100.0,
            instance_count: instances.len() as u32,
            trail_count: trail.len() as u32,
            rush_active: (hud.rush_remaining_ms > 0) as u32,
            magnet_active: (hud.magnet_remaining_ms > 0) as u32,
            in_oil: frame.in_oil as u32,
        },
        instances,
        trail,
    }
}
