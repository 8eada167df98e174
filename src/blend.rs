use std::fmt;

/// Weight applied to a source or destination term of the blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SourceColor,
    OneMinusSourceColor,
    SourceAlpha,
    OneMinusSourceAlpha,
    DestinationColor,
    OneMinusDestinationColor,
    DestinationAlpha,
    OneMinusDestinationAlpha,
    SourceAlphaSaturated,
}

/// Operation combining the weighted source and destination terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Describes how a draw combines its output with the destination image.
///
/// Two draws can only be merged into a single GPU submission when their blend descriptors are
/// equal, so the struct compares field by field.
///
/// # Examples
///
/// ```
/// use grafo_batch::{Blend, BlendFactor};
///
/// let blend = Blend::SOURCE_OVER;
/// assert_eq!(blend.src_factor_rgb, BlendFactor::One);
/// assert_eq!(blend.dst_factor_rgb, BlendFactor::OneMinusSourceAlpha);
///
/// let state: grafo_batch::wgpu::BlendState = blend.into();
/// assert_eq!(state, grafo_batch::wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blend {
    pub src_factor_rgb: BlendFactor,
    pub src_factor_alpha: BlendFactor,
    pub dst_factor_rgb: BlendFactor,
    pub dst_factor_alpha: BlendFactor,
    pub operation_rgb: BlendOperation,
    pub operation_alpha: BlendOperation,
}

impl Blend {
    /// Premultiplied-alpha "source over destination" compositing.
    pub const SOURCE_OVER: Self = Self::uniform(
        BlendFactor::One,
        BlendFactor::OneMinusSourceAlpha,
        BlendOperation::Add,
    );
    /// Replaces the destination with the source.
    pub const COPY: Self = Self::uniform(BlendFactor::One, BlendFactor::Zero, BlendOperation::Add);
    /// Clears the destination regardless of the source.
    pub const CLEAR: Self = Self::uniform(BlendFactor::Zero, BlendFactor::Zero, BlendOperation::Add);

    /// Same factors and operation for the color and alpha channels.
    pub const fn uniform(src: BlendFactor, dst: BlendFactor, operation: BlendOperation) -> Self {
        Self {
            src_factor_rgb: src,
            src_factor_alpha: src,
            dst_factor_rgb: dst,
            dst_factor_alpha: dst,
            operation_rgb: operation,
            operation_alpha: operation,
        }
    }
}

impl Default for Blend {
    fn default() -> Self {
        Self::SOURCE_OVER
    }
}

impl fmt::Display for Blend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{src-color: {:?}, src-alpha: {:?}, dst-color: {:?}, dst-alpha: {:?}, op-color: {:?}, op-alpha: {:?}}}",
            self.src_factor_rgb,
            self.src_factor_alpha,
            self.dst_factor_rgb,
            self.dst_factor_alpha,
            self.operation_rgb,
            self.operation_alpha
        )
    }
}

impl From<BlendFactor> for wgpu::BlendFactor {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SourceColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSourceColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SourceAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSourceAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DestinationColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDestinationColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DestinationAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDestinationAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
            BlendFactor::SourceAlphaSaturated => wgpu::BlendFactor::SrcAlphaSaturated,
        }
    }
}

impl From<BlendOperation> for wgpu::BlendOperation {
    fn from(operation: BlendOperation) -> Self {
        match operation {
            BlendOperation::Add => wgpu::BlendOperation::Add,
            BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
            BlendOperation::ReverseSubtract => wgpu::BlendOperation::ReverseSubtract,
            BlendOperation::Min => wgpu::BlendOperation::Min,
            BlendOperation::Max => wgpu::BlendOperation::Max,
        }
    }
}

impl From<Blend> for wgpu::BlendState {
    fn from(blend: Blend) -> Self {
        wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: blend.src_factor_rgb.into(),
                dst_factor: blend.dst_factor_rgb.into(),
                operation: blend.operation_rgb.into(),
            },
            alpha: wgpu::BlendComponent {
                src_factor: blend.src_factor_alpha.into(),
                dst_factor: blend.dst_factor_alpha.into(),
                operation: blend.operation_alpha.into(),
            },
        }
    }
}
