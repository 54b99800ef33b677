//! Algorithm configuration, as found in the `[algorithm]` table of a scene
//! file or in a stand-alone TOML document.
//!
//! ```toml
//! type = "FP"
//! ProjectionDataId = 2
//! VolumeDataId = 1
//!
//! [option]
//! GPUindex = 0
//! DetectorSuperSampling = 4
//! ```

use serde::Deserialize;

use crate::manager::{DataId, ProjectorId};

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlgorithmConfig {

    /// Which algorithm to create: `"FP"` or `"FDK"`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "ProjectionDataId")]
    pub projection_data: Option<DataId>,

    /// The volume read by forward projection, or written by reconstruction
    #[serde(rename = "VolumeDataId", alias = "ReconstructionDataId")]
    pub volume_data: Option<DataId>,

    #[serde(rename = "ProjectorId")]
    pub projector: Option<ProjectorId>,

    #[serde(rename = "option", default)]
    pub options: Options,
}

/// Tuning parameters. Absent values take the algorithm's defaults; values
/// are kept signed so that out-of-range settings reach validation rather
/// than failing to parse.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(from = "OptionTable")]
pub struct Options {

    /// `-1` selects the backend's default device
    pub gpu_index: Option<i64>,
    pub voxel_supersampling: Option<i64>,
    pub detector_supersampling: Option<i64>,
    pub short_scan: Option<bool>,
}

/// The `[option]` table as written. Both spellings of the GPU index may
/// appear; `GPUIndex` takes precedence over `GPUindex`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionTable {
    #[serde(rename = "GPUindex")]              gpu_index            : Option<i64>,
    #[serde(rename = "GPUIndex")]              gpu_index_capitalized: Option<i64>,
    #[serde(rename = "VoxelSuperSampling")]    voxel_supersampling   : Option<i64>,
    #[serde(rename = "DetectorSuperSampling")] detector_supersampling: Option<i64>,
    #[serde(rename = "ShortScan")]             short_scan            : Option<bool>,
}

impl From<OptionTable> for Options {
    fn from(table: OptionTable) -> Self {
        Self {
            gpu_index             : table.gpu_index_capitalized.or(table.gpu_index),
            voxel_supersampling   : table.voxel_supersampling,
            detector_supersampling: table.detector_supersampling,
            short_scan            : table.short_scan,
        }
    }
}

pub const GPU_INDEX              : &str = "GPUindex";
pub const VOXEL_SUPERSAMPLING    : &str = "VoxelSuperSampling";
pub const DETECTOR_SUPERSAMPLING : &str = "DetectorSuperSampling";
pub const SHORT_SCAN             : &str = "ShortScan";

impl Options {

    /// Names of the options that were set
    pub fn present(&self) -> impl Iterator<Item = &'static str> {
        [
            (GPU_INDEX             , self.gpu_index             .is_some()),
            (VOXEL_SUPERSAMPLING   , self.voxel_supersampling   .is_some()),
            (DETECTOR_SUPERSAMPLING, self.detector_supersampling.is_some()),
            (SHORT_SCAN            , self.short_scan            .is_some()),
        ]
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
    }

    /// Options that were set but which an algorithm consuming only
    /// `consumed` would ignore
    pub fn unused<'a>(&'a self, consumed: &'a [&'a str]) -> impl Iterator<Item = &'static str> + 'a {
        self.present().filter(move |name| !consumed.contains(name))
    }
}

impl AlgorithmConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
