/// Default store layout
pub const DEFAULT_DATA_DIR: &str = "dados";
pub const DEFAULT_EXTRACT_FILE: &str = "dados_iqarj.csv";
pub const DEFAULT_HISTORY_FILE: &str = "dados_iqarj_historicos.csv";
pub const DEFAULT_TIME_TABLE: &str = "df_dtempo.csv";
pub const DEFAULT_LOCATION_TABLE: &str = "df_dlocalizacao.csv";
pub const DEFAULT_STATION_TABLE: &str = "df_destacao.csv";
pub const DEFAULT_FACT_TABLE: &str = "df_fqualidadear.csv";
pub const DEFAULT_CONFIG_FILE: &str = "airq-etl.toml";
pub const DEFAULT_INPUT_ENCODING: &str = "utf-8";

/// Store bookkeeping files
pub const LOCK_FILE: &str = ".airq-etl.lock";
pub const COMMIT_MANIFEST_FILE: &str = ".airq-etl.commit";
pub const STAGED_FILE_PREFIX: &str = ".staged-";

/// Environment prefix for settings overrides
pub const ENV_PREFIX: &str = "AIRQ_ETL";

/// Raw extract columns
pub const RAW_TIMESTAMP: &str = "data";
pub const RAW_LATITUDE: &str = "lat";
pub const RAW_LONGITUDE: &str = "lon";
pub const RAW_STATION_ID: &str = "codnum";
pub const RAW_STATION_NAME: &str = "estação";
pub const RAW_UTM_X: &str = "x_utm_sirgas2000";
pub const RAW_UTM_Y: &str = "y_utm_sirgas2000";

/// Timestamp layout used by the upstream extract, e.g. `2023/01/01 01:00:00+00`
pub const RAW_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%#z";

/// Measurement columns, in fact-table order
pub const MEASUREMENT_COLUMNS: [&str; 18] = [
    "chuva",
    "pres",
    "rs",
    "temp",
    "ur",
    "dir_vento",
    "vel_vento",
    "so2",
    "no2",
    "hcnm",
    "hct",
    "ch4",
    "co",
    "no",
    "nox",
    "o3",
    "pm10",
    "pm2_5",
];

/// Dimension and fact columns
pub const TIME_COLUMNS: [&str; 6] = ["tempo_key", "ano", "mes", "dia", "hora", "timestamp"];
pub const LOCATION_COLUMNS: [&str; 3] = ["localizacao_key", "latitude", "longitude"];
pub const STATION_COLUMNS: [&str; 3] = ["estacao_key", "station_id", "station_name"];
pub const FACT_KEY_COLUMNS: [&str; 4] = ["id", "tempo_key", "estacao_key", "localizacao_key"];

/// Parquet export defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
