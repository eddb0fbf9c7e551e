/// World-space point, metres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Position plus orientation quaternion `(x, y, z, w)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: [f32; 4],
}

impl Pose {
    pub const fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Plane and anchor services supplied by the AR engine.
pub trait PlaneTracking {
    type Plane: Clone + PartialEq;
    type Anchor;

    /// The plane that absorbed `plane` after a merge, if any.
    fn subsumed_by(&self, plane: &Self::Plane) -> Option<Self::Plane>;

    fn center_pose(&self, plane: &Self::Plane) -> Pose;

    fn create_anchor_at(&mut self, plane: &Self::Plane, pose: Pose) -> Self::Anchor;

    fn release_anchor(&mut self, anchor: Self::Anchor);
}

// Bounds the subsumption walk if the engine ever reports a cycle.
const MAX_SUBSUMPTION_HOPS: usize = 64;

/// Keeps the nutrition panel attached to a tracked plane.
///
/// Owned by the renderer that hosts the panel, next to the engine's
/// [`PlaneTracking`] implementation. The frame loop never touches it: the
/// renderer calls [`PanelAnchor::update`] once per tick and draws the
/// [`PresentationState`](crate::PresentationState) at
/// [`PanelAnchor::position`] while [`PanelAnchor::is_visible`].
pub struct PanelAnchor<T: PlaneTracking> {
    plane: Option<T::Plane>,
    anchor: Option<T::Anchor>,
    position: Vec3,
    y_offset: f32,
}

impl<T: PlaneTracking> Default for PanelAnchor<T> {
    fn default() -> Self {
        Self {
            plane: None,
            anchor: None,
            position: Vec3::default(),
            y_offset: 0.0,
        }
    }
}

impl<T: PlaneTracking> PanelAnchor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the panel to `plane` at `anchor_point`, the spot in front of
    /// the viewer where the panel should float. Any previous anchor is
    /// released.
    pub fn select_plane(&mut self, tracking: &mut T, plane: T::Plane, anchor_point: Vec3) {
        if let Some(old) = self.anchor.take() {
            tracking.release_anchor(old);
        }

        let center = tracking.center_pose(&plane);
        self.anchor = Some(tracking.create_anchor_at(&plane, Pose::at(anchor_point)));
        self.y_offset = anchor_point.y - center.position.y;
        self.position = Vec3::new(
            anchor_point.x,
            center.position.y + self.y_offset,
            anchor_point.z,
        );
        self.plane = Some(plane);

        tracing::debug!(y_offset = self.y_offset, "Panel anchored to plane");
    }

    /// Per-tick update while tracking. Follows plane merges so the panel
    /// stays on the surviving plane. Returns true if the attached plane
    /// changed.
    pub fn update(&mut self, tracking: &T) -> bool {
        let Some(mut current) = self.plane.clone() else {
            return false;
        };

        let mut hops = 0;
        while let Some(parent) = tracking.subsumed_by(&current) {
            if hops == MAX_SUBSUMPTION_HOPS || parent == current {
                tracing::warn!(hops, "Plane subsumption did not settle");
                break;
            }
            current = parent;
            hops += 1;
        }

        if hops == 0 {
            return false;
        }

        self.position.y = tracking.center_pose(&current).position.y + self.y_offset;
        self.plane = Some(current);
        tracing::debug!(hops, "Panel moved to subsuming plane");
        true
    }

    pub fn plane(&self) -> Option<&T::Plane> {
        self.plane.as_ref()
    }

    pub fn anchor(&self) -> Option<&T::Anchor> {
        self.anchor.as_ref()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The panel renders only once it has been anchored.
    pub fn is_visible(&self) -> bool {
        self.anchor.is_some()
    }
}
