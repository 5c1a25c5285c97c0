mod api;
mod error;
mod layout;
mod raster;
mod tiff;
mod util;


pub use api::{
    read_dataset, supported_formats, supported_label_formats, write_dataset, write_labels,
};
pub use error::{IoError, Result};
pub use layout::StackLayout;
