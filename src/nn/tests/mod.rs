mod analyzer;
mod capture;
mod layer_activation;
mod layer_conv2d;
mod registry;
