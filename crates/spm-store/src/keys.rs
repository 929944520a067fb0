//! Property names the store declares.

/// Process-wide display state.
pub mod super_keys {
    pub const DATA_ID_TIME_SORTED: &str = "data_id_time_sorted";
    pub const SXM_VIEWER_VALUE: &str = "sxm_viewer_value";
    pub const DAT_VIEWER_VALUE: &str = "dat_viewer_value";
    pub const DAT_VIEWER_VALUE_2: &str = "dat_viewer_value_2";
    pub const SXM_SHOW_VALUE: &str = "sxm_show_value";
    pub const DB_SAVE_TIME: &str = "db_save_time";
    pub const MULTI_Y_PLOT_VALUE: &str = "multi_y_plot_value";
    pub const SORT_MODE: &str = "sort_mode";

    /// Created, all `Null`, whenever a database is created.
    pub const ALL: [&str; 8] = [
        DATA_ID_TIME_SORTED,
        SXM_VIEWER_VALUE,
        DAT_VIEWER_VALUE,
        DAT_VIEWER_VALUE_2,
        SXM_SHOW_VALUE,
        DB_SAVE_TIME,
        MULTI_Y_PLOT_VALUE,
        SORT_MODE,
    ];
}

// Shared per-file properties.
pub const LIKED: &str = "liked";
pub const GROUP: &str = "group";
pub const CHECKED: &str = "checked";
pub const TAGS: &str = "tags";
pub const CHANNEL_NAMES: &str = "channel_names";
pub const PRERENDER: &str = "prerender";

// Spectrum properties.
pub const CURRENT_XCHANNEL: &str = "current_xchannel";
pub const CURRENT_YCHANNEL: &str = "current_ychannel";
pub const FXCHANNEL: &str = "fxchannel";
pub const FYCHANNEL: &str = "fychannel";
pub const DIRECTION: &str = "direction";
pub const CALC_OPTIONS: &str = "calc_options";
pub const SPLINE_SMOOTHNESS: &str = "spline_smoothness";
pub const SXM_REF: &str = "sxm_ref";
pub const CURRENT_SHOW_POSITIONS: &str = "current_show_positions";

// Scan properties.
pub const CURRENT_CHANNEL: &str = "current_channel";
pub const FCHANNEL: &str = "fchannel";
pub const CURRENT_DIRECTION: &str = "current_direction";
pub const CURRENT_FLATTEN: &str = "current_flatten";
pub const CURRENT_OFFSET: &str = "current_offset";
pub const CURRENT_SCALE: &str = "current_scale";
pub const CURRENT_SHOW_PARAMS: &str = "current_show_params";

pub const SPECTRUM_KEYS: [&str; 9] = [
    CURRENT_XCHANNEL,
    CURRENT_YCHANNEL,
    FXCHANNEL,
    FYCHANNEL,
    DIRECTION,
    CALC_OPTIONS,
    SPLINE_SMOOTHNESS,
    SXM_REF,
    CURRENT_SHOW_POSITIONS,
];

pub const SCAN_KEYS: [&str; 7] = [
    CURRENT_CHANNEL,
    FCHANNEL,
    CURRENT_DIRECTION,
    CURRENT_FLATTEN,
    CURRENT_OFFSET,
    CURRENT_SCALE,
    CURRENT_SHOW_PARAMS,
];
