pub mod color_model;
pub mod detection;
pub mod frame;
pub mod grid_sampler;
pub mod overlay;
pub mod pixel;
pub mod region_aggregator;
