//! Reader configuration.

/// Configuration for reading a container.
///
/// # Example
///
/// ```
/// use pdbook::ReadOptions;
///
/// let options = ReadOptions::new().with_section_breaks(false);
/// assert!(options.sniff_images);
/// assert!(!options.section_breaks);
/// ```
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Locate Mobipocket image records by signature when the header has no image index.
    pub sniff_images: bool,
    /// Emit section boundaries for Plucker end-of-section flags and Mobipocket page breaks.
    pub section_breaks: bool,
    /// Interpret Mobipocket text as markup. When false it is read as plain PalmDoc text.
    pub mobi_markup: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            sniff_images: true,
            section_breaks: true,
            mobi_markup: true,
        }
    }
}

impl ReadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sniff_images(mut self, sniff_images: bool) -> Self {
        self.sniff_images = sniff_images;
        self
    }

    pub fn with_section_breaks(mut self, section_breaks: bool) -> Self {
        self.section_breaks = section_breaks;
        self
    }

    pub fn with_mobi_markup(mut self, mobi_markup: bool) -> Self {
        self.mobi_markup = mobi_markup;
        self
    }
}
