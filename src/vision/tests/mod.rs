mod colormap;
mod load;
