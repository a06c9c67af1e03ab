use glam::Vec2;
use ironclad_numerics::Angle;
use serde::{Deserialize, Serialize};

/// `Vec2` as a 2-element JSON array rather than relying on `glam`'s own derived shape.
mod vec2_serde {
    use glam::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        [value.x, value.y].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        let [x, y] = <[f32; 2]>::deserialize(deserializer)?;
        Ok(Vec2::new(x, y))
    }
}

/// The broad category an [`crate::EntityTypeId`] belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    Boat,
    Weapon,
    Aircraft,
    Decoy,
    Collectible,
    Obstacle,
}

/// A specific flavor within a [`Kind`]. Deliberately a closed `enum`, not a string: loading a
/// catalog entry with a `subKind` this list doesn't know about is a startup failure
/// ([`crate::CatalogError::UnknownSubKind`]) rather than a silently-accepted default.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubKind {
    // boats
    Submarine,
    Ram,
    Dredger,
    Hovercraft,
    Tanker,
    Pirate,
    Cruiser,
    // weapons / launched ordnance
    Shell,
    Torpedo,
    Missile,
    Rocket,
    Sam,
    DepthCharge,
    Mine,
    Depositor,
    Sonar,
    // aircraft / decoys
    Aircraft,
    Decoy,
    // collectibles
    Scrap,
    Coin,
    Barrel,
    // obstacles
    Platform,
    Hq,
    Reef,
}

impl SubKind {
    /// Whether reloading this armament is loud enough to force a submerged submarine to the
    /// surface: true for everything except torpedoes and decoys. A property of the armament
    /// being reloaded, not of the boat carrying it.
    #[must_use]
    pub fn is_noisy_when_reloading(self) -> bool {
        !matches!(self, Self::Torpedo | Self::Decoy)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorType {
    Visual,
    Radar,
    Sonar,
}

/// Maximum sensing range for each modality, in meters, at full exposure (surfaced, no altitude
/// penalty applied).
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensors {
    #[serde(default)]
    pub visual: f32,
    #[serde(default)]
    pub radar: f32,
    #[serde(default)]
    pub sonar: f32,
}

impl Sensors {
    #[must_use]
    pub fn max_range(&self) -> f32 {
        self.visual.max(self.radar).max(self.sonar)
    }
}

/// A rotatable mount on a boat's deck; holds zero or more armaments via
/// [`ArmamentMount::turret`].
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurretMount {
    #[serde(with = "vec2_serde")]
    pub offset: Vec2,
    pub base_angle: Angle,
    /// Azimuth sweep allowed on either side of `base_angle`.
    pub azimuth_limit: Angle,
}

/// A launch point for a projectile, decoy, aircraft or depositor charge.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArmamentMount {
    #[serde(with = "vec2_serde")]
    pub offset: Vec2,
    pub angle: Angle,
    #[serde(default)]
    pub vertical: bool,
    /// Index into the carrying type's `turrets`, if this mount rides on a turret.
    #[serde(default)]
    pub turret: Option<usize>,
    /// Name of the catalog entry this mount launches, resolved to an id at load time.
    pub launches: Option<String>,
    pub reload_seconds: f32,
    /// Multiplier applied to this mount's reload rate while the carrier is submerged, and a
    /// further `×4` while airdropped (handled by the physics crate, not stored here).
    #[serde(default = "default_submerged_reload_factor")]
    pub submerged_reload_factor: f32,
}

fn default_submerged_reload_factor() -> f32 {
    0.2
}

/// Raw, pre-resolution catalog entry as it appears in the embedded JSON file. [`crate::Catalog`]
/// turns a list of these into resolved [`crate::EntityTypeData`] records.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntityType {
    pub name: String,
    pub kind: Kind,
    pub sub_kind: SubKind,
    #[serde(default = "default_level")]
    pub level: u8,
    pub length: f32,
    pub width: f32,
    #[serde(default)]
    pub speed: f32,
    #[serde(default)]
    pub lifespan_seconds: f32,
    /// Fraction of full health (`1.0` = instant kill) dealt on a successful hit, or for
    /// collectibles/weapons-as-ammo, the reload time credited to the slot that fired it.
    #[serde(default)]
    pub damage: f32,
    #[serde(default)]
    pub reload_seconds: f32,
    #[serde(default)]
    pub anti_aircraft: f32,
    #[serde(default)]
    pub stealth: f32,
    #[serde(default)]
    pub sensors: Sensors,
    #[serde(default)]
    pub turrets: Vec<TurretMount>,
    #[serde(default)]
    pub armaments: Vec<ArmamentMount>,
    #[serde(default)]
    pub npc_only: bool,
}

fn default_level() -> u8 {
    1
}
