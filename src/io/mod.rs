pub mod csv;
pub mod geojson;
pub mod results;
