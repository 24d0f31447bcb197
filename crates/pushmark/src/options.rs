use bitflags::bitflags;

bitflags! {
    /// Parser behavior switches. All of them default to off; the
    /// [`ParserOptions::GITHUB`] preset bundles the extensions GitHub
    /// enables on top of CommonMark.
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParserOptions: u32 {
        /// Collapse non-trivial whitespace runs in normal text into a
        /// single space.
        const COLLAPSE_WHITESPACE = 1;
        /// Do not require a space between the `#` run and the title of an
        /// ATX heading.
        const PERMISSIVE_ATX_HEADERS = 1 << 1;
        /// Recognize bare URLs (`http://`, `https://`, `ftp://`) without
        /// angle brackets.
        const PERMISSIVE_URL_AUTOLINKS = 1 << 2;
        /// Recognize bare e-mail addresses without angle brackets.
        const PERMISSIVE_EMAIL_AUTOLINKS = 1 << 3;
        /// Disable indented code blocks.
        const NO_INDENTED_CODE_BLOCKS = 1 << 4;
        /// Disable raw HTML blocks.
        const NO_HTML_BLOCKS = 1 << 5;
        /// Disable raw HTML inline spans.
        const NO_HTML_SPANS = 1 << 6;
        /// Enable pipe tables.
        const TABLES = 1 << 8;
        /// Enable `~`/`~~` strikethrough spans.
        const STRIKETHROUGH = 1 << 9;
        /// Recognize bare `www.` links without a scheme.
        const PERMISSIVE_WWW_AUTOLINKS = 1 << 10;
        /// Enable `[ ]` / `[x]` / `[X]` task list markers.
        const TASK_LISTS = 1 << 11;
        /// Enable `$...$` inline and `$$...$$` display math spans.
        const LATEX_MATH_SPANS = 1 << 12;
        /// Enable `[[target]]` and `[[target|label]]` wiki links.
        const WIKILINKS = 1 << 13;
        /// Interpret `_` runs as underline spans instead of emphasis.
        const UNDERLINE = 1 << 14;
        /// Emit every soft break as a hard break.
        const HARD_SOFT_BREAKS = 1 << 15;

        /// All three permissive autolink forms.
        const PERMISSIVE_AUTOLINKS = Self::PERMISSIVE_URL_AUTOLINKS.bits()
            | Self::PERMISSIVE_EMAIL_AUTOLINKS.bits()
            | Self::PERMISSIVE_WWW_AUTOLINKS.bits();
        /// Both HTML recognizers disabled.
        const NO_HTML = Self::NO_HTML_BLOCKS.bits() | Self::NO_HTML_SPANS.bits();

        /// The GitHub dialect: permissive autolinks, tables, strikethrough
        /// and task lists.
        const GITHUB = Self::PERMISSIVE_AUTOLINKS.bits()
            | Self::TABLES.bits()
            | Self::STRIKETHROUGH.bits()
            | Self::TASK_LISTS.bits();
    }
}

impl ParserOptions {
    pub(crate) fn permissive_autolinks(&self) -> bool {
        self.intersects(ParserOptions::PERMISSIVE_AUTOLINKS)
    }
}
