//! The resource packager: collect every in-package file of a validated
//! description, rewrite the sources to unique local file names, and
//! materialize the whole thing as a folder or zip archive with the RDF
//! written last.

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ordermap::OrderMap;

use bioimg_rdf::build::{build_description, AnyDescription, FormatSelector};
use bioimg_rdf::rdf::attachment::Attachment;
use bioimg_rdf::rdf::file_description::FileDescr;
use bioimg_rdf::rdf::file_reference::{FileReference, FsPath};
use bioimg_rdf::rdf::generic::GenericBase;
use bioimg_rdf::rdf::icon::Icon;
use bioimg_rdf::rdf::model::weights::{ArchitectureDescr, WeightsDescr};
use bioimg_rdf::rdf::model::{ModelDescr, WeightsFormat};
use bioimg_rdf::summary::Status;
use bioimg_rdf::yaml::Mapping;
use bioimg_rdf::{IoCheckError, Severity, ValidationContext};

use crate::load::{context_for, open_bioimageio_yaml, LoadError, LoadOptions, BIOIMAGEIO_YAML, LEGACY_RDF_NAMES};
use crate::settings::Settings;
use crate::source::FileSourceResolver;

#[derive(thiserror::Error, Debug)]
pub enum PackagingError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Could not serialize RDF: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error(transparent)]
    Resolve(#[from] IoCheckError),
    #[error("Reserved file name '{0}' not allowed for a file to be packaged")]
    ReservedName(String),
    #[error("Too many file name clashes for '{0}'")]
    TooManyClashes(String),
    #[error("None of the requested weights formats is available ({available})")]
    NoMatchingWeights { available: String },
    #[error("The description is invalid and cannot be packaged: {0}")]
    InvalidDescription(String),
    #[error("Exported package at '{0}' is invalid")]
    InvalidPackage(PathBuf),
}

#[derive(Clone, Debug, Default)]
pub struct PackageOptions {
    /// Which format version to package at. The default packages the resource
    /// at its declared format version; pass [`FormatSelector::Latest`] to
    /// upgrade while packaging.
    pub format_selector: FormatSelector,
    pub weights_priority_order: Vec<WeightsFormat>,
    /// Deflate level for zip output.
    pub compression_level: Option<i64>,
    /// Downgrade a failing post-export validation to a logged error.
    pub allow_invalid: bool,
}

/// Collects `(local_filename, source, sha256)` triples while the description
/// tree is rewritten.
struct PackageCollector {
    rdf_file_name: String,
    files: OrderMap<String, FileDescr>,
}

impl PackageCollector {
    fn new(rdf_file_name: String) -> Self {
        Self {
            rdf_file_name,
            files: OrderMap::new(),
        }
    }

    /// Register a file and hand back the descriptor rewritten to its local
    /// name. Name clashes between different sources get `_2`..`_19` appended
    /// to the first dot segment.
    fn add(&mut self, descr: &FileDescr) -> Result<FileDescr, PackagingError> {
        let mut fname = descr.source.file_name();
        if fname == self.rdf_file_name
            || fname == BIOIMAGEIO_YAML
            || fname.ends_with(".bioimageio.yaml")
            || LEGACY_RDF_NAMES.contains(&fname.as_str())
        {
            return Err(PackagingError::ReservedName(fname));
        }

        if let Some(existing) = self.files.get(&fname) {
            if existing.source != descr.source {
                let (head, rest) = match fname.split_once('.') {
                    Some((head, rest)) => (head.to_owned(), Some(rest.to_owned())),
                    None => (fname.clone(), None),
                };
                let mut found = None;
                for i in 2..20 {
                    let alternative = match &rest {
                        Some(rest) => format!("{head}_{i}.{rest}"),
                        None => format!("{head}_{i}"),
                    };
                    match self.files.get(&alternative) {
                        Some(taken) if taken.source != descr.source => continue,
                        _ => {
                            found = Some(alternative);
                            break;
                        }
                    }
                }
                fname = found.ok_or(PackagingError::TooManyClashes(fname))?;
            }
        }

        let _ = self.files.insert(fname.clone(), descr.clone());
        let local = FsPath::try_from(fname).expect("a bare file name is a valid relative path");
        Ok(FileDescr {
            source: FileReference::Path(local),
            sha256: descr.sha256.clone(),
        })
    }

    fn add_reference(&mut self, reference: &FileReference) -> Result<FileReference, PackagingError> {
        Ok(self.add(&FileDescr::new(reference.clone()))?.source)
    }
}

fn package_base(base: &GenericBase, collector: &mut PackageCollector) -> Result<GenericBase, PackagingError> {
    let mut packaged = base.clone();
    packaged.covers = base
        .covers
        .iter()
        .map(|cover| collector.add_reference(cover))
        .collect::<Result<_, _>>()?;
    packaged.attachments = base
        .attachments
        .iter()
        .map(|attachment| {
            let descr = collector.add(&attachment.file_descr())?;
            Ok(Attachment {
                source: descr.source,
                sha256: descr.sha256,
                extra: attachment.extra.clone(),
            })
        })
        .collect::<Result<_, PackagingError>>()?;
    if let Some(Icon::FileRef(reference)) = &base.icon {
        packaged.icon = Some(Icon::FileRef(collector.add_reference(reference)?));
    }
    if let Some(documentation) = &base.documentation {
        packaged.documentation = Some(collector.add(documentation)?);
    }
    Ok(packaged)
}

fn package_weights(weights: &WeightsDescr, collector: &mut PackageCollector) -> Result<WeightsDescr, PackagingError> {
    let mut packaged = weights.clone();
    if let Some(entry) = &mut packaged.keras_hdf5 {
        entry.base.file = collector.add(&entry.base.file)?;
    }
    if let Some(entry) = &mut packaged.onnx {
        entry.base.file = collector.add(&entry.base.file)?;
    }
    if let Some(entry) = &mut packaged.pytorch_state_dict {
        entry.base.file = collector.add(&entry.base.file)?;
        if let ArchitectureDescr::FromFile(architecture) = &mut entry.architecture {
            architecture.file = collector.add(&architecture.file)?;
        }
        if let Some(dependencies) = &mut entry.dependencies {
            *dependencies = collector.add(dependencies)?;
        }
    }
    if let Some(entry) = &mut packaged.tensorflow_js {
        entry.base.file = collector.add(&entry.base.file)?;
    }
    if let Some(entry) = &mut packaged.tensorflow_saved_model_bundle {
        entry.base.file = collector.add(&entry.base.file)?;
        if let Some(dependencies) = &mut entry.dependencies {
            *dependencies = collector.add(dependencies)?;
        }
    }
    if let Some(entry) = &mut packaged.torchscript {
        entry.base.file = collector.add(&entry.base.file)?;
    }
    Ok(packaged)
}

fn package_model(descr: &ModelDescr, collector: &mut PackageCollector) -> Result<ModelDescr, PackagingError> {
    let mut packaged = descr.clone();
    packaged.base = package_base(&descr.base, collector)?;
    packaged.weights = package_weights(&descr.weights, collector)?;
    packaged.inputs = descr.inputs.try_map(|tensor| {
        let mut tensor = tensor.clone();
        if let Some(test_tensor) = &tensor.test_tensor {
            tensor.test_tensor = Some(collector.add(test_tensor)?);
        }
        if let Some(sample_tensor) = &tensor.sample_tensor {
            tensor.sample_tensor = Some(collector.add(sample_tensor)?);
        }
        Ok::<_, PackagingError>(tensor)
    })?;
    packaged.outputs = descr.outputs.try_map(|tensor| {
        let mut tensor = tensor.clone();
        if let Some(test_tensor) = &tensor.test_tensor {
            tensor.test_tensor = Some(collector.add(test_tensor)?);
        }
        if let Some(sample_tensor) = &tensor.sample_tensor {
            tensor.sample_tensor = Some(collector.add(sample_tensor)?);
        }
        Ok::<_, PackagingError>(tensor)
    })?;
    Ok(packaged)
}

fn package_description(
    descr: &AnyDescription,
    collector: &mut PackageCollector,
) -> Result<AnyDescription, PackagingError> {
    match descr {
        AnyDescription::Model(model) => Ok(AnyDescription::Model(package_model(model, collector)?)),
        AnyDescription::Application(app) => {
            let mut packaged = app.clone();
            packaged.base = package_base(&app.base, collector)?;
            if let Some(source) = &app.source {
                packaged.source = Some(collector.add(source)?);
            }
            Ok(AnyDescription::Application(packaged))
        }
        AnyDescription::Notebook(notebook) => {
            let mut packaged = notebook.clone();
            packaged.base = package_base(&notebook.base, collector)?;
            packaged.source = collector.add(&notebook.source)?;
            Ok(AnyDescription::Notebook(packaged))
        }
        AnyDescription::Dataset(dataset) => {
            let mut packaged = dataset.clone();
            packaged.base = package_base(&dataset.base, collector)?;
            Ok(AnyDescription::Dataset(packaged))
        }
        AnyDescription::Collection(collection) => {
            let mut packaged = collection.clone();
            packaged.base = package_base(&collection.base, collector)?;
            Ok(AnyDescription::Collection(packaged))
        }
        AnyDescription::Generic(generic) => {
            let mut packaged = generic.clone();
            packaged.base = package_base(&generic.base, collector)?;
            Ok(AnyDescription::Generic(packaged))
        }
        AnyDescription::Legacy(_) => Err(PackagingError::InvalidDescription(
            "legacy descriptions are packaged after updating to the latest format".into(),
        )),
    }
}

fn os_friendly_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Apply the weights priority filter: keep only the first requested format
/// that is present.
fn filter_weights(
    descr: &AnyDescription,
    priority_order: &[WeightsFormat],
    ctx: &ValidationContext,
) -> Result<AnyDescription, PackagingError> {
    let Some(model) = descr.as_model() else {
        return Ok(descr.clone());
    };
    if priority_order.is_empty() {
        return Ok(descr.clone());
    }
    let available = model.weights.available_formats();
    let Some(chosen) = priority_order.iter().find(|format| available.contains(format)) else {
        return Err(PackagingError::NoMatchingWeights {
            available: available
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    };

    let mut filtered = model.clone();
    filtered.weights = model.weights.retain_format(*chosen);

    // the filtered description must still be a valid model
    let revalidation_ctx = ValidationContext {
        perform_io_checks: false,
        warning_level: Severity::Error,
        ..ctx.clone()
    };
    let content = AnyDescription::Model(filtered).to_content();
    let reloaded = build_description(
        &bioimg_rdf::yaml::YamlValue::Mapping(content),
        &revalidation_ctx,
        FormatSelector::Latest,
    );
    match reloaded.description {
        Some(descr) if reloaded.summary.status != Status::Failed => Ok(descr),
        _ => {
            let first = reloaded
                .summary
                .errors()
                .next()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".into());
            Err(PackagingError::InvalidDescription(first))
        }
    }
}

/// The content of a package: every collected file keyed by its local name,
/// plus the rewritten RDF document.
pub struct PackageContent {
    pub rdf_file_name: String,
    pub rdf_content: Mapping,
    pub files: OrderMap<String, FileDescr>,
}

pub fn get_package_content(
    descr: &AnyDescription,
    ctx: &ValidationContext,
    options: &PackageOptions,
) -> Result<PackageContent, PackagingError> {
    let descr = filter_weights(descr, &options.weights_priority_order, ctx)?;

    let name = descr.name().unwrap_or_else(|| "resource".into());
    let rdf_file_name = format!(
        "{}.{}.bioimageio.yaml",
        os_friendly_file_name(&name),
        descr.resource_type()
    );

    let mut collector = PackageCollector::new(rdf_file_name.clone());
    let packaged = package_description(&descr, &mut collector)?;

    Ok(PackageContent {
        rdf_file_name,
        rdf_content: packaged.to_content(),
        files: collector.files,
    })
}

struct PreparedPackage {
    content: PackageContent,
    resolver: FileSourceResolver,
    ctx: ValidationContext,
}

fn prepare_package(source: &str, options: &PackageOptions) -> Result<PreparedPackage, PackagingError> {
    let settings = Settings::shared();
    let opened = open_bioimageio_yaml(source, settings.clone())?;
    let load_options = LoadOptions::default();
    let ctx = context_for(&opened, &load_options, settings.clone());

    let loaded = build_description(&opened.content, &ctx, options.format_selector.clone());
    let Some(descr) = (if loaded.summary.status == Status::Failed {
        None
    } else {
        loaded.description
    }) else {
        let first = loaded
            .summary
            .errors()
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".into());
        return Err(PackagingError::InvalidDescription(first));
    };

    let content = get_package_content(&descr, &ctx, options)?;
    let resolver = FileSourceResolver::new(opened.resolver_root.clone(), settings);
    Ok(PreparedPackage { content, resolver, ctx })
}

/// Write the package as a folder; the RDF itself is written last.
pub fn save_bioimageio_package_as_folder(
    source: &str,
    output_path: Option<&Path>,
    options: &PackageOptions,
) -> Result<PathBuf, PackagingError> {
    let prepared = prepare_package(source, options)?;

    let output = match output_path {
        Some(path) => path.to_owned(),
        None => std::env::temp_dir().join(format!("bioimageio_package_{}", std::process::id())),
    };
    std::fs::create_dir_all(&output)?;

    for (local_name, descr) in prepared.content.files.iter() {
        let bytes = prepared.resolver.read_bytes(&prepared.ctx, &descr.source)?;
        std::fs::write(output.join(local_name), bytes)?;
    }
    crate::load::write_yaml_file(
        &prepared.content.rdf_content,
        &output.join(&prepared.content.rdf_file_name),
    )?;

    Ok(output)
}

fn write_package_zip<S: Write + Seek>(prepared: &PreparedPackage, sink: S, options: &PackageOptions) -> Result<(), PackagingError> {
    let mut writer = zip::ZipWriter::new(sink);
    let file_options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(options.compression_level);

    for (local_name, descr) in prepared.content.files.iter() {
        let bytes = prepared.resolver.read_bytes(&prepared.ctx, &descr.source)?;
        writer.start_file(local_name.as_str(), file_options)?;
        writer.write_all(&bytes)?;
    }

    writer.start_file(prepared.content.rdf_file_name.as_str(), file_options)?;
    let rdf_yaml = serde_yaml::to_string(&prepared.content.rdf_content)?;
    writer.write_all(rdf_yaml.as_bytes())?;

    let _ = writer.finish()?;
    Ok(())
}

/// Package a bioimageio resource as a zip file. The written archive is
/// re-loaded and re-validated; a failure at this stage is fatal unless
/// `allow_invalid` downgrades it to a logged error.
pub fn save_bioimageio_package(
    source: &str,
    output_path: Option<&Path>,
    options: &PackageOptions,
) -> Result<PathBuf, PackagingError> {
    let prepared = prepare_package(source, options)?;

    let output = match output_path {
        Some(path) => path.to_owned(),
        None => std::env::temp_dir().join(format!("bioimageio_package_{}.zip", std::process::id())),
    };
    let file = std::fs::File::create(&output)?;
    write_package_zip(&prepared, file, options)?;

    let check_options = LoadOptions {
        warning_level: Severity::Error,
        ..LoadOptions::default()
    };
    let reloaded = crate::load::load_description(&output.to_string_lossy(), &check_options)?;
    if reloaded.summary.status == Status::Failed {
        if options.allow_invalid {
            tracing::error!("exported package at '{}' is invalid", output.to_string_lossy());
        } else {
            return Err(PackagingError::InvalidPackage(output));
        }
    }

    Ok(output)
}

/// Package into an arbitrary stream; skips the post-export validation.
pub fn save_bioimageio_package_to_stream<S: Write + Seek>(
    source: &str,
    stream: S,
    options: &PackageOptions,
) -> Result<S, PackagingError> {
    let prepared = prepare_package(source, options)?;
    let mut stream = stream;
    write_package_zip(&prepared, &mut stream, options)?;
    Ok(stream)
}
