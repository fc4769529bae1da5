// folio-common: shared book and outline types for the Folio workspace

pub mod types;
