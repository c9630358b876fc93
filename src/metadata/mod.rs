// Media metadata module

pub mod extractor;
