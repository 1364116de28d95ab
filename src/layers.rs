use crate::config::ColumnConfig;
use crate::error::Result;
use crate::io::geojson::{read_features, to_cities, to_lines, to_watersheds};
use crate::observation::WatershedId;
use geo::{BoundingRect, LineString, MultiPolygon, Point, Rect, coord};
use log::{info, warn};
use std::path::{Path, PathBuf};

// Watershed polygon keyed by HYBAS_ID
#[derive(Debug, Clone)]
pub struct Watershed {
    pub id: WatershedId,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct City {
    pub name: Option<String>,
    pub location: Point<f64>,
}

// Every vector layer drawn on the map
#[derive(Debug, Clone, Default)]
pub struct MapLayers {
    pub watersheds: Vec<Watershed>,
    pub rivers_exceedance: Vec<LineString<f64>>,
    pub rivers_stream: Vec<LineString<f64>>,
    pub basin_outline: Vec<LineString<f64>>,
    pub cities: Vec<City>,
}

// Well-known file locations under the data directory
#[derive(Debug, Clone)]
pub struct LayerPaths {
    pub watersheds: PathBuf,
    pub rivers_exceedance: PathBuf,
    pub rivers_stream: PathBuf,
    pub basin_outline: PathBuf,
    pub cities: PathBuf,
}

impl LayerPaths {
    pub fn in_dir(data_dir: &Path) -> Self {
        let geometry_dir = data_dir.join("geometry");
        LayerPaths {
            watersheds: geometry_dir.join("watersheds.geojson"),
            rivers_exceedance: geometry_dir.join("rivers_exceedance.geojson"),
            rivers_stream: geometry_dir.join("rivers_stream.geojson"),
            basin_outline: geometry_dir.join("main_basin.geojson"),
            cities: geometry_dir.join("cities.geojson"),
        }
    }
}

// Optional layers are skipped with a warning when their file is absent
fn load_optional<T>(
    path: &Path,
    layer: &str,
    convert: impl FnOnce(Vec<geojson::Feature>) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    if !path.exists() {
        warn!("No {} layer found at {}, skipping", layer, path.display());
        return Ok(Vec::new());
    }
    convert(read_features(path)?)
}

impl MapLayers {
    pub fn load(paths: &LayerPaths, config: &ColumnConfig) -> Result<Self> {
        let watersheds = to_watersheds(read_features(&paths.watersheds)?, &config.geometry_id)?;

        let layers = MapLayers {
            watersheds,
            rivers_exceedance: load_optional(&paths.rivers_exceedance, "river exceedance", |f| {
                to_lines(f, "river exceedance")
            })?,
            rivers_stream: load_optional(&paths.rivers_stream, "river stream", |f| {
                to_lines(f, "river stream")
            })?,
            basin_outline: load_optional(&paths.basin_outline, "main basin", |f| {
                to_lines(f, "main basin")
            })?,
            cities: load_optional(&paths.cities, "cities", |f| to_cities(f, &config.city_name))?,
        };

        info!(
            "Loaded {} watersheds, {} exceedance and {} stream river lines, {} basin rings, {} cities",
            layers.watersheds.len(),
            layers.rivers_exceedance.len(),
            layers.rivers_stream.len(),
            layers.basin_outline.len(),
            layers.cities.len()
        );
        Ok(layers)
    }

    /// Bounding box over every layer, `None` when all layers are empty.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let rects = self
            .watersheds
            .iter()
            .filter_map(|w| w.geometry.bounding_rect())
            .chain(
                self.rivers_exceedance
                    .iter()
                    .chain(&self.rivers_stream)
                    .chain(&self.basin_outline)
                    .filter_map(|l| l.bounding_rect()),
            )
            .chain(self.cities.iter().map(|c| c.location.bounding_rect()));

        rects.reduce(|a, b| {
            Rect::new(
                coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
    }
}
