/// Configuration management for thumbnail-service
///
/// Loaded once at startup and shared read-only between invocations.
/// Values come from a lookup function so tests never touch the process
/// environment; `from_env` plugs in `std::env::var`.
use crate::error::ConfigError;
use crate::services::thumbnail::ThumbnailConfig;
use image::ImageFormat;
use std::str::FromStr;

const DEFAULT_IMAGE_SIZE_LIMIT: u64 = 2 * 1024 * 1024;
const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff"];

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// AWS region of the buckets
    pub region: String,
    /// When set, events from any other bucket are rejected
    pub expected_source_bucket: Option<String>,
    /// Bucket that receives the thumbnails
    pub destination_bucket: String,
    /// Upper bound on the source object size in bytes
    pub max_input_byte_size: u64,
    /// Lower-cased key suffixes treated as images
    pub image_extensions: Vec<String>,
    pub thumbnail: ThumbnailConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let region = get("REGION")
            .or_else(|| get("AWS_REGION"))
            .ok_or(ConfigError::Missing("REGION"))?;
        let destination_bucket = get("OUTBOX_BUCKET").ok_or(ConfigError::Missing("OUTBOX_BUCKET"))?;
        let expected_source_bucket = get("INBOX_BUCKET");

        let max_input_byte_size =
            parse_or("IMAGE_SIZE_LIMIT", get("IMAGE_SIZE_LIMIT"), DEFAULT_IMAGE_SIZE_LIMIT)?;
        if max_input_byte_size == 0 {
            return Err(invalid("IMAGE_SIZE_LIMIT", "0", "must be greater than zero"));
        }

        let defaults = ThumbnailConfig::default();
        let width = parse_or("THUMBNAIL_WIDTH", get("THUMBNAIL_WIDTH"), defaults.width)?;
        let height = parse_or("THUMBNAIL_HEIGHT", get("THUMBNAIL_HEIGHT"), defaults.height)?;
        if width == 0 {
            return Err(invalid("THUMBNAIL_WIDTH", "0", "must be greater than zero"));
        }
        if height == 0 {
            return Err(invalid("THUMBNAIL_HEIGHT", "0", "must be greater than zero"));
        }

        let upscale_small_images = parse_or(
            "THUMBNAIL_UPSCALE",
            get("THUMBNAIL_UPSCALE"),
            defaults.upscale_small_images,
        )?;

        let jpeg_quality: u8 = parse_or(
            "THUMBNAIL_JPEG_QUALITY",
            get("THUMBNAIL_JPEG_QUALITY"),
            defaults.jpeg_quality,
        )?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(invalid(
                "THUMBNAIL_JPEG_QUALITY",
                &jpeg_quality.to_string(),
                "must be between 1 and 100",
            ));
        }

        let output_format = get("THUMBNAIL_FORMAT")
            .map(|v| parse_output_format(&v))
            .transpose()?;

        let image_extensions = match get("THUMBNAIL_IMAGE_EXTENSIONS") {
            Some(raw) => {
                let list: Vec<String> = raw
                    .split(',')
                    .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if list.is_empty() {
                    return Err(invalid(
                        "THUMBNAIL_IMAGE_EXTENSIONS",
                        &raw,
                        "must list at least one extension",
                    ));
                }
                list
            }
            None => DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(Self {
            region,
            expected_source_bucket,
            destination_bucket,
            max_input_byte_size,
            image_extensions,
            thumbnail: ThumbnailConfig {
                width,
                height,
                upscale_small_images,
                output_format,
                jpeg_quality,
            },
        })
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value
            .parse()
            .map_err(|e: T::Err| invalid(name, &value, &e.to_string())),
        None => Ok(default),
    }
}

fn parse_output_format(raw: &str) -> Result<ImageFormat, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "png" => Ok(ImageFormat::Png),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        _ => Err(invalid("THUMBNAIL_FORMAT", raw, "expected one of jpeg, png, tiff")),
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
