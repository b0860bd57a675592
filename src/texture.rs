use std::path::Path;

use log::{error, info};

use crate::gpu::GpuContext;

/// A decoded image, flipped so row 0 is the bottom of the picture.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file before expansion to RGBA.
    pub channels: u8,
    pub rgba: Vec<u8>,
}

/// Decode an image file into bottom-up RGBA8.
pub fn decode_image(path: impl AsRef<Path>) -> Result<DecodedImage, image::ImageError> {
    let img = image::open(path)?.flipv();
    let channels = img.color().channel_count();
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        channels,
        rgba: rgba.into_raw(),
    })
}

/// A GPU texture that can be bound to shaders. The view keeps the texture alive.
#[derive(Debug)]
pub struct Texture {
    pub(crate) view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw RGBA data.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &Self::descriptor(label, width, height),
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            view,
            width,
            height,
        }
    }

    /// A 1x1 texture with no image data uploaded.
    pub fn blank(gpu: &GpuContext, label: &str) -> Self {
        let texture = gpu.device.create_texture(&Self::descriptor(label, 1, 1));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            width: 1,
            height: 1,
        }
    }

    /// Load a texture from an image file.
    pub fn from_file(gpu: &GpuContext, path: &Path) -> Result<Self, image::ImageError> {
        let image = decode_image(path)?;
        let label = path.display().to_string();
        Ok(Self::from_rgba(gpu, &image.rgba, image.width, image.height, &label))
    }

    /// Like [`from_file`](Self::from_file), but a decode failure is logged and
    /// yields a [`blank`](Self::blank) texture.
    pub fn load_or_blank(gpu: &GpuContext, path: &Path) -> Self {
        match Self::from_file(gpu, path) {
            Ok(texture) => {
                info!(
                    "loaded texture {} ({}x{})",
                    path.display(),
                    texture.width,
                    texture.height
                );
                texture
            }
            Err(err) => {
                error!("failed to load texture {}: {err}", path.display());
                Self::blank(gpu, &path.display().to_string())
            }
        }
    }

    fn descriptor(label: &str, width: u32, height: u32) -> wgpu::TextureDescriptor<'_> {
        wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        }
    }
}

/// Two textures and a shared sampler, bound together as one material.
pub struct TextureSet {
    pub(crate) bind_group: wgpu::BindGroup,
}

impl TextureSet {
    /// Bind group layout matching `@group(1)` of the scene fragment shader:
    /// textures at bindings 0 and 1, sampler at binding 2.
    pub fn layout(gpu: &GpuContext) -> wgpu::BindGroupLayout {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        gpu.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Set Layout"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
    }

    pub fn new(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        textures: [&Texture; 2],
    ) -> Self {
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Set Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture Set"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&textures[0].view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&textures[1].view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self { bind_group }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_and_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_rows.png");
        let mut img = image::RgbImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 0, 255]));
        img.save(&path).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 2));
        assert_eq!(decoded.channels, 3);
        assert_eq!(&decoded.rgba[0..4], &[0, 0, 255, 255]);
        assert_eq!(&decoded.rgba[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(decode_image(dir.path().join("missing.png")).is_err());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(decode_image(&path).is_err());
    }
}
