pub mod load;
pub mod npy;
pub mod package;
pub mod settings;
pub mod source;

pub use load::{
    load_description, open_bioimageio_yaml, update_format, update_hashes, validate_format, LoadError, LoadOptions,
};
pub use package::{
    get_package_content, save_bioimageio_package, save_bioimageio_package_as_folder,
    save_bioimageio_package_to_stream, PackageOptions, PackagingError,
};
pub use settings::Settings;
pub use source::FileSourceResolver;
