//! GIBS imagery layers the dashboard can tile. GIBS is not behind the API gateway, so the
//! proxy only hands out the templates.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GibsLayer {
    pub id: &'static str,
    pub title: &'static str,
    pub template: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GibsCatalogue {
    pub layers: &'static [GibsLayer],
}

const LAYERS: &[GibsLayer] = &[
    GibsLayer {
        id: "MODIS_Terra_CorrectedReflectance_TrueColor",
        title: "MODIS Terra True Color",
        template: "https://gibs.earthdata.nasa.gov/wmts/epsg4326/best/MODIS_Terra_CorrectedReflectance_TrueColor/default/{Time}/{TileMatrixSet}/{z}/{y}/{x}.jpg",
    },
    GibsLayer {
        id: "VIIRS_CityLights_2012",
        title: "VIIRS City Lights",
        template: "https://gibs.earthdata.nasa.gov/wmts/epsg4326/best/VIIRS_CityLights_2012/default/{Time}/{TileMatrixSet}/{z}/{y}/{x}.jpg",
    },
];

pub fn catalogue() -> GibsCatalogue {
    GibsCatalogue { layers: LAYERS }
}
