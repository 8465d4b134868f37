use serde::{Deserialize, Serialize};

use super::image::ImageResponse;
use super::shared::Patch;
use crate::entity::grenade;
use crate::validator::{Validator, permitted};

pub const GRENADE_TYPES: &[&str] = &["smoke", "molotov", "he", "flash", "decoy"];
pub const SIDES: &[&str] = &["CT", "T"];

const MAP_MAX_BYTES: usize = 100;
const TITLE_MAX_BYTES: usize = 500;
const DESCRIPTION_MAX_BYTES: usize = 700;

/// Content fields of a grenade. Doubles as the create payload.
///
/// Missing keys decode to empty strings so they surface as validation
/// failures instead of decode errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct GrenadeInput {
    #[schema(example = "dust2")]
    pub map: String,
    #[schema(example = "Smoke CT to A")]
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    #[schema(example = "smoke")]
    pub grenade_type: String,
    #[schema(example = "CT")]
    pub side: String,
}

impl From<&grenade::Model> for GrenadeInput {
    fn from(m: &grenade::Model) -> Self {
        Self {
            map: m.map.clone(),
            title: m.title.clone(),
            description: m.description.clone(),
            grenade_type: m.grenade_type.clone(),
            side: m.side.clone(),
        }
    }
}

/// Partial update body. `null` and a missing key both leave the field unchanged.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateGrenadeRequest {
    #[schema(value_type = Option<String>)]
    pub map: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,
    #[serde(rename = "type")]
    #[schema(value_type = Option<String>)]
    pub grenade_type: Patch<String>,
    #[schema(value_type = Option<String>)]
    pub side: Patch<String>,
}

impl UpdateGrenadeRequest {
    pub fn merge_into(self, input: &mut GrenadeInput) {
        self.map.apply(&mut input.map);
        self.title.apply(&mut input.title);
        self.description.apply(&mut input.description);
        self.grenade_type.apply(&mut input.grenade_type);
        self.side.apply(&mut input.side);
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GrenadeResponse {
    pub id: i32,
    pub map: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub grenade_type: String,
    pub side: String,
    pub version: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageResponse>,
}

impl GrenadeResponse {
    pub fn with_images(mut self, images: Vec<ImageResponse>) -> Self {
        self.images = images;
        self
    }
}

impl From<grenade::Model> for GrenadeResponse {
    fn from(m: grenade::Model) -> Self {
        Self {
            id: m.id,
            map: m.map,
            title: m.title,
            description: m.description,
            grenade_type: m.grenade_type,
            side: m.side,
            version: m.version,
            images: Vec::new(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GrenadeEnvelope {
    pub grenade: GrenadeResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GrenadeListEnvelope {
    pub grenades: Vec<GrenadeResponse>,
}

/// Listing filters. Empty values match every grenade.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListGrenadesQuery {
    pub map: Option<String>,
    pub side: Option<String>,
    #[serde(rename = "type")]
    pub grenade_type: Option<String>,
    /// One of `id, map, side, type`, optionally prefixed with `-` for descending order.
    pub sort: Option<String>,
}

impl ListGrenadesQuery {
    /// Stable, form-encoded rendering of the effective query, used as part of the cache key.
    pub fn canonical(&self) -> Result<String, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string([
            ("map", self.map.as_deref().unwrap_or_default()),
            ("side", self.side.as_deref().unwrap_or_default()),
            ("sort", self.sort.as_deref().unwrap_or("id")),
            ("type", self.grenade_type.as_deref().unwrap_or_default()),
        ])
    }
}

pub fn validate_grenade(v: &mut Validator, input: &GrenadeInput) {
    v.check(!input.map.is_empty(), "map", "must be provided");
    v.check(
        input.map.len() <= MAP_MAX_BYTES,
        "map",
        format!("must not be greater than {MAP_MAX_BYTES} bytes"),
    );

    v.check(!input.title.is_empty(), "title", "must be provided");
    v.check(
        input.title.len() <= TITLE_MAX_BYTES,
        "title",
        format!("must not be greater than {TITLE_MAX_BYTES} bytes"),
    );

    v.check(
        input.description.len() <= DESCRIPTION_MAX_BYTES,
        "description",
        format!("must not be greater than {DESCRIPTION_MAX_BYTES} bytes"),
    );

    v.check(!input.grenade_type.is_empty(), "type", "must be provided");
    v.check(
        permitted(input.grenade_type.as_str(), GRENADE_TYPES),
        "type",
        "value of type must be smoke|molotov|he|flash|decoy",
    );

    v.check(!input.side.is_empty(), "side", "must be provided");
    v.check(
        permitted(input.side.as_str(), SIDES),
        "side",
        "value of side must be T or CT",
    );
}
