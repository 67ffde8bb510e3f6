//! Page layout calculations

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// A5 size (148mm × 210mm), the sheet rescaled invoice pages land on
    pub fn a5() -> Self {
        Self {
            width: Length::from_mm(148.0),
            height: Length::from_mm(210.0),
        }
    }

    /// MediaBox for this sheet, in points, rounded to 1/100 pt
    pub fn media_box(&self) -> PageBox {
        PageBox::new(0.0, 0.0, round_pt(self.width.pt()), round_pt(self.height.pt()))
    }
}

fn round_pt(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A PDF rectangle in points: lower-left and upper-right corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

impl PageBox {
    pub fn new(llx: f64, lly: f64, urx: f64, ury: f64) -> Self {
        // Normalise so width and height are never negative
        Self {
            llx: llx.min(urx),
            lly: lly.min(ury),
            urx: llx.max(urx),
            ury: lly.max(ury),
        }
    }

    pub fn width(&self) -> f64 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f64 {
        self.ury - self.lly
    }
}

/// Uniform scale plus translation, i.e. the `cm` operands `s 0 0 s tx ty`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    /// Content stream operator applying this transform
    pub fn to_cm(&self) -> String {
        format!("{:.6} 0 0 {:.6} {:.6} {:.6} cm", self.scale, self.scale, self.tx, self.ty)
    }
}

/// Scale `source` to fit inside `sheet`, keeping its aspect ratio, and center it.
///
/// The coordinate system has origin at bottom-left of the sheet.
/// A degenerate source box yields the identity scale centered on the sheet.
pub fn fit_centered(source: &PageBox, sheet: &PageBox) -> Transform {
    let (sw, sh) = (source.width(), source.height());
    let (tw, th) = (sheet.width(), sheet.height());

    let scale = if sw > 0.0 && sh > 0.0 {
        (tw / sw).min(th / sh)
    } else {
        1.0
    };

    let tx = sheet.llx + (tw - scale * sw) / 2.0 - scale * source.llx;
    let ty = sheet.lly + (th - scale * sh) / 2.0 - scale * source.lly;

    Transform { scale, tx, ty }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        assert!((Length::from_mm(25.4).pt() - 72.0).abs() < 1e-9);
        assert!((Length::from_mm(148.0).pt() - 419.53).abs() < 0.01);
    }

    #[test]
    fn test_letter_size() {
        let letter = PageDimensions::letter();
        assert!((letter.width.pt() - 612.0).abs() < 0.01);
        assert!((letter.height.pt() - 792.0).abs() < 0.01);
    }

    #[test]
    fn test_a5_media_box_in_points() {
        let media = PageDimensions::a5().media_box();
        assert_eq!(media.llx, 0.0);
        assert_eq!(media.lly, 0.0);
        assert!((media.urx - 419.53).abs() < 1e-9);
        assert!((media.ury - 595.28).abs() < 1e-9);
    }

    #[test]
    fn test_page_box_normalises_corners() {
        let b = PageBox::new(612.0, 792.0, 0.0, 0.0);
        assert_eq!(b.width(), 612.0);
        assert_eq!(b.height(), 792.0);
    }

    #[test]
    fn test_fit_a4_onto_a5_stays_inside_and_centred() {
        let a4 = PageBox::new(0.0, 0.0, 595.28, 841.89);
        let a5 = PageDimensions::a5().media_box();
        let t = fit_centered(&a4, &a5);

        // A5 is roughly A4 scaled by 1/sqrt(2)
        assert!((t.scale - std::f64::consts::FRAC_1_SQRT_2).abs() < 5e-3);

        let w = a4.width() * t.scale;
        let h = a4.height() * t.scale;
        assert!(w <= a5.width() + 1e-9);
        assert!(h <= a5.height() + 1e-9);
        assert!((2.0 * t.tx + w - a5.width()).abs() < 1e-9);
        assert!((2.0 * t.ty + h - a5.height()).abs() < 1e-9);
    }

    #[test]
    fn test_fit_letter_centres_vertically() {
        let letter = PageBox::new(0.0, 0.0, 612.0, 792.0);
        let a5 = PageDimensions::a5().media_box();
        let t = fit_centered(&letter, &a5);

        // Width is the binding dimension for Letter on A5
        assert!((t.scale - 419.53 / 612.0).abs() < 1e-9);
        assert!(t.tx.abs() < 1e-9);
        let used_height = 792.0 * t.scale;
        assert!((t.ty - (595.28 - used_height) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_accounts_for_offset_origin() {
        let source = PageBox::new(100.0, 100.0, 200.0, 200.0);
        let sheet = PageBox::new(0.0, 0.0, 100.0, 100.0);
        let t = fit_centered(&source, &sheet);
        assert_eq!(t.scale, 1.0);
        assert_eq!(t.tx, -100.0);
        assert_eq!(t.ty, -100.0);
    }

    #[test]
    fn test_cm_operator() {
        let t = Transform { scale: 0.5, tx: 10.0, ty: 20.0 };
        assert_eq!(t.to_cm(), "0.500000 0 0 0.500000 10.000000 20.000000 cm");
    }
}
