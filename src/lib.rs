pub mod border;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod model;
pub mod packing;
pub mod plan;
pub mod plate;
pub mod render;
pub mod session;
pub mod theme;

pub use border::{BorderMask, BorderOverlay, compute_borders, replicate_links};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, GridConfig, RenderConfig, load_config};
pub use csv_io::{ImportedLayout, export_csv, import_csv};
pub use error::PlateError;
pub use model::{Coordinate, Orientation, QueuedSample, SampleWell, Selection, Well};
pub use packing::pack;
pub use plan::PlatePlan;
pub use plate::Plate;
pub use render::render_svg;
pub use session::DesignSession;
pub use theme::Theme;
