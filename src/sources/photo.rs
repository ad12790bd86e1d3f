use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::config::Config;
use crate::errors::{PlannerError, PlannerResult};
use crate::logging::Logger;
use crate::patch::{Document, FieldBinding};
use crate::sources::traits::DashboardSource;

const STREAM: &str = "photo";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Background-photo rotator: picks a random image from the photo
/// directory and points the stylesheet's background declaration at it.
pub struct PhotoSource {
    photos_dir: PathBuf,
    css_file: PathBuf,
    interval: Duration,
    logger: Logger,
}

impl PhotoSource {
    pub fn new(config: &Config, logger: Logger) -> Self {
        Self {
            photos_dir: PathBuf::from(&config.photos_dir),
            css_file: PathBuf::from(&config.css_directory),
            interval: config.photo_interval(),
            logger,
        }
    }

    fn pick_photo(&self) -> PlannerResult<String> {
        let photos = list_images(&self.photos_dir)?;

        photos
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                PlannerError::PhotoDir(format!(
                    "no image files in {}",
                    self.photos_dir.display()
                ))
            })
    }

    fn binding(photo: &str) -> FieldBinding {
        FieldBinding::text(
            "background",
            "background: url(../photos/",
            ") no-repeat center center fixed",
            photo,
        )
    }
}

fn list_images(dir: &Path) -> PlannerResult<Vec<String>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PlannerError::PhotoDir(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut photos: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();

    // Directory order is platform-dependent; a stable list keeps the
    // uniform choice uniform across runs.
    photos.sort();
    Ok(photos)
}

impl DashboardSource for PhotoSource {
    fn name(&self) -> &'static str {
        "photo"
    }

    fn log_stream(&self) -> &'static str {
        STREAM
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn refresh(&self) -> PlannerResult<()> {
        let photo = self.pick_photo()?;

        let mut doc = Document::load(&self.css_file)?;
        for name in doc.apply(&[Self::binding(&photo)]) {
            self.logger.warn(
                STREAM,
                &format!("marker pair for '{}' not found; field left unchanged", name),
            );
        }
        doc.save()?;

        self.logger
            .info(STREAM, &format!("background photo set to {}", photo));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch;
    use tempfile::TempDir;

    fn source(photos_dir: &Path, css_file: &Path) -> PhotoSource {
        let config = Config {
            photos_dir: photos_dir.display().to_string(),
            css_directory: css_file.display().to_string(),
            photo_reload_interval: 30,
            ..Config::default()
        };
        PhotoSource::new(&config, Logger::new(TempDir::new().unwrap().path()))
    }

    #[test]
    fn test_list_images_filters_extensions() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.PNG", "c.txt", "d.gif", "notes.md"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let photos = list_images(dir.path()).unwrap();
        assert_eq!(photos, vec!["a.jpg", "b.PNG", "d.gif"]);
    }

    #[test]
    fn test_pick_photo_returns_a_listed_image() {
        let dir = TempDir::new().unwrap();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let css = TempDir::new().unwrap();
        let source = source(dir.path(), &css.path().join("planner.css"));

        let photo = source.pick_photo().unwrap();
        assert!(["a.jpg", "b.jpg", "c.jpg"].contains(&photo.as_str()));
    }

    #[test]
    fn test_empty_directory_is_recoverable_error() {
        let dir = TempDir::new().unwrap();
        let css = TempDir::new().unwrap();
        let source = source(dir.path(), &css.path().join("planner.css"));

        assert!(matches!(
            source.pick_photo().unwrap_err(),
            PlannerError::PhotoDir(_)
        ));
    }

    #[test]
    fn test_binding_rewrites_background_declaration() {
        let css = "body { background: url(../photos/old.jpg) no-repeat center center fixed; }";
        let outcome = patch::apply(css, &[PhotoSource::binding("new.png")]);

        assert_eq!(
            outcome.text,
            "body { background: url(../photos/new.png) no-repeat center center fixed; }"
        );
    }

    #[test]
    fn test_refresh_persists_patched_stylesheet() {
        let photos = TempDir::new().unwrap();
        fs::write(photos.path().join("only.jpg"), b"").unwrap();

        let css_dir = TempDir::new().unwrap();
        let css_file = css_dir.path().join("planner.css");
        fs::write(
            &css_file,
            "background: url(../photos/old.jpg) no-repeat center center fixed;",
        )
        .unwrap();

        let source = source(photos.path(), &css_file);
        source.refresh().unwrap();

        assert_eq!(
            fs::read_to_string(&css_file).unwrap(),
            "background: url(../photos/only.jpg) no-repeat center center fixed;"
        );
    }
}
