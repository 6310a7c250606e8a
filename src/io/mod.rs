pub mod netcdf_io;
pub mod tabular;
