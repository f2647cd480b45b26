pub mod get_next_occurrence;
