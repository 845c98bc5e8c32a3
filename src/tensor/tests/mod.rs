mod shape;
mod stats;
