pub mod printed_label;
