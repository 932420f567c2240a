pub mod cancel;
pub mod collab;
pub mod config;
pub mod dict;
pub mod engine;
pub mod error;
pub mod input;
pub mod keep;
pub mod pipeline;
pub mod state;
pub mod tips;
pub mod value;

pub use cancel::{AbortHandle, AbortSignal};
pub use collab::{I18nTable, I18nText, NoI18n, PlainText, Template, TextFormatter, VisiblePredicate};
pub use config::{BoxConfig, DictConfig, TiboxConfig};
pub use dict::{Dict, DictItem, DictName, DictRegistry, DictSource, ItemMapping, OptionsSpec, StaticOptions};
pub use engine::{BoxEvent, InputBox, InputBoxBuilder};
pub use error::{BoxError, ConfigError, Error, ProcessingError, ResolveError, Result};
pub use input::{Translation, ValueInput};
pub use keep::{FileStore, Keep, KeepMode, KeepSpec, KeepStore, KeepStores, MemoryStore};
pub use pipeline::{processor_fn, processor_sync, Stage, ValuePipeline, ValueProcessor};
pub use state::{BoxState, KeyStroke};
pub use tips::{
    FetchHandle, FetchOutcome, TipItem, TipList, TipListController, TipOptions, TipRequest,
    TipShowTime, TriggerReason,
};
pub use value::CaseMode;
